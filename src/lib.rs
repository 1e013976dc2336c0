//! Grenadier: movement-and-collision core for a tile-world platformer.
//!
//! `domain` holds the per-entity controller and its collaborators (tile
//! grid, collision, intents, aim). `sim` owns a running level: the entity
//! table, level loading and the per-frame step.

pub mod config;
pub mod domain;
pub mod sim;
