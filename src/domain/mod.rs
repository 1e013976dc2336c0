pub mod aim;
pub mod collision;
pub mod controller;
pub mod entity;
pub mod geom;
pub mod grid;
pub mod intent;
pub mod tile;
