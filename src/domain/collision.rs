/// Per-axis collision resolution against the tile grid.
///
/// Movement is integrated one axis at a time: move along the axis, ask the
/// grid for the nearest blocking cell, clamp the leading edge flush with it,
/// zero that velocity component. Horizontal is always resolved before
/// vertical by callers, which keeps boxes from tunnelling into corners.

use tracing::warn;

use super::geom::{Axis, Rect};
use super::grid::TileGrid;

/// Result of the grid query for one axis.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AxisHit {
    pub collided: bool,
    pub region: Option<Rect>,
}

/// What happened when a box was moved along one axis.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AxisOutcome {
    Free,
    /// Clamped against `region`. `positive` is true when the box was moving
    /// toward +x / +y (for the vertical axis: a landing).
    Blocked { region: Rect, positive: bool },
    /// Overlapping geometry while not moving along the axis. Left as is.
    StaticOverlap { region: Rect },
}

impl AxisOutcome {
    pub fn landed(&self) -> bool {
        matches!(self, AxisOutcome::Blocked { positive: true, .. })
    }
}

/// Query the grid for the first blocking cell overlapped by `rect`.
pub fn resolve_axis(grid: &TileGrid, rect: &Rect, axis: Axis, velocity_sign: f32) -> AxisHit {
    let region = grid.first_solid_in(rect, axis, velocity_sign);
    AxisHit { collided: region.is_some(), region }
}

/// Integrate `rect` along `axis` by `velocity * dt`, then clamp and zero
/// `velocity` if the new position overlaps a solid cell.
pub fn move_axis(
    grid: &TileGrid,
    rect: &mut Rect,
    velocity: &mut f32,
    axis: Axis,
    dt: f32,
) -> AxisOutcome {
    match axis {
        Axis::Horizontal => rect.x += *velocity * dt,
        Axis::Vertical => rect.y += *velocity * dt,
    }

    let hit = resolve_axis(grid, rect, axis, *velocity);
    let region = match hit.region {
        Some(r) => r,
        None => return AxisOutcome::Free,
    };

    match axis {
        Axis::Horizontal => {
            if *velocity > 0.0 {
                rect.x = region.x - rect.w;
            } else if *velocity < 0.0 {
                rect.x = region.right();
            } else {
                warn!(x = rect.x, y = rect.y, "horizontal_overlap_without_motion");
                return AxisOutcome::StaticOverlap { region };
            }
            let positive = *velocity > 0.0;
            *velocity = 0.0;
            AxisOutcome::Blocked { region, positive }
        }
        Axis::Vertical => {
            let positive = *velocity >= 0.0;
            if positive {
                rect.y = region.y - rect.h;
            } else {
                rect.y = region.bottom();
            }
            *velocity = 0.0;
            AxisOutcome::Blocked { region, positive }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from(rows: &[&str]) -> TileGrid {
        TileGrid::from_rows(rows, 16.0, 16.0)
    }

    #[test]
    fn free_motion_just_integrates() {
        let g = grid_from(&["    ", "    "]);
        let mut r = Rect::new(0.0, 0.0, 14.0, 14.0);
        let mut vx = 60.0;
        let out = move_axis(&g, &mut r, &mut vx, Axis::Horizontal, 0.5);
        assert_eq!(out, AxisOutcome::Free);
        assert_eq!(r.x, 30.0);
        assert_eq!(vx, 60.0);
    }

    #[test]
    fn moving_right_clamps_to_wall_left_edge() {
        let g = grid_from(&["   #"]);
        let mut r = Rect::new(30.0, 0.0, 14.0, 14.0);
        let mut vx = 100.0;
        let out = move_axis(&g, &mut r, &mut vx, Axis::Horizontal, 0.1);
        assert!(matches!(out, AxisOutcome::Blocked { positive: true, .. }));
        assert_eq!(r.right(), 48.0);
        assert_eq!(vx, 0.0);
    }

    #[test]
    fn moving_left_clamps_to_wall_right_edge() {
        let g = grid_from(&["#   "]);
        let mut r = Rect::new(20.0, 0.0, 14.0, 14.0);
        let mut vx = -100.0;
        move_axis(&g, &mut r, &mut vx, Axis::Horizontal, 0.1);
        assert_eq!(r.x, 16.0);
        assert_eq!(vx, 0.0);
    }

    #[test]
    fn left_map_edge_is_a_wall() {
        let g = grid_from(&["    "]);
        let mut r = Rect::new(2.0, 0.0, 14.0, 14.0);
        let mut vx = -100.0;
        move_axis(&g, &mut r, &mut vx, Axis::Horizontal, 0.1);
        assert_eq!(r.x, 0.0);
    }

    #[test]
    fn static_horizontal_overlap_is_left_alone() {
        let g = grid_from(&["#   "]);
        let mut r = Rect::new(10.0, 0.0, 14.0, 14.0);
        let mut vx = 0.0;
        let out = move_axis(&g, &mut r, &mut vx, Axis::Horizontal, 0.1);
        assert!(matches!(out, AxisOutcome::StaticOverlap { .. }));
        assert_eq!(r.x, 10.0);
        assert_eq!(vx, 0.0);
    }

    #[test]
    fn falling_lands_on_top_edge() {
        let g = grid_from(&["  ", "  ", "  ", "  ", "  ", "  ", "##"]);
        let mut r = Rect::new(0.0, 62.0, 14.0, 32.0);
        let mut vy = 100.0;
        let out = move_axis(&g, &mut r, &mut vy, Axis::Vertical, 0.1);
        assert!(out.landed());
        assert_eq!(r.bottom(), 96.0);
        assert_eq!(vy, 0.0);
    }

    #[test]
    fn move_ending_exactly_on_floor_lands() {
        let g = grid_from(&["  ", "  ", "  ", "  ", "  ", "  ", "##"]);
        let mut r = Rect::new(0.0, 54.0, 14.0, 32.0);
        let mut vy = 100.0;
        let out = move_axis(&g, &mut r, &mut vy, Axis::Vertical, 0.1);
        assert!(out.landed());
        assert_eq!(r.y, 64.0);
        assert_eq!(vy, 0.0);
    }

    #[test]
    fn rising_bumps_ceiling_bottom_edge() {
        let g = grid_from(&["##", "  ", "  ", "  "]);
        let mut r = Rect::new(0.0, 20.0, 14.0, 32.0);
        let mut vy = -100.0;
        let out = move_axis(&g, &mut r, &mut vy, Axis::Vertical, 0.1);
        assert!(matches!(out, AxisOutcome::Blocked { positive: false, .. }));
        assert!(!out.landed());
        assert_eq!(r.y, 16.0);
        assert_eq!(vy, 0.0);
    }

    #[test]
    fn resolve_axis_reports_region() {
        let g = grid_from(&[" #"]);
        let hit = resolve_axis(&g, &Rect::new(10.0, 0.0, 14.0, 14.0), Axis::Horizontal, 1.0);
        assert!(hit.collided);
        assert_eq!(hit.region, Some(Rect::new(16.0, 0.0, 16.0, 16.0)));
    }
}
