/// Box and axis helpers. World space is y-down, units are pixels;
/// vectors are `glam::Vec2`.

use glam::Vec2;

/// Axis-aligned box; `(x, y)` is the top-left corner.
/// Edges are half-open for overlap, so a box ending at 96 does not overlap a
/// cell starting at 96 (downward contact is handled by the grid scan).
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn right(&self) -> f32 { self.x + self.w }
    pub fn bottom(&self) -> f32 { self.y + self.h }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    Horizontal,
    Vertical,
}
