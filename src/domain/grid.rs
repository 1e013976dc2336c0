/// Static tile world used for collision queries.
///
/// Cell `(tx, ty)` covers world box `[tx*tw, (tx+1)*tw) x [ty*th, (ty+1)*th)`.
///
/// ## Out-of-bounds policy
///
///   - Left / right of the map: solid (the world has walls).
///   - Above / below the map: empty (entities may jump off the top
///     or fall out of the bottom; the sim treats the latter as lethal).
///
/// The grid is read-only while a frame runs.

use std::ops::RangeInclusive;

use super::geom::{Axis, Rect};
use super::tile::Tile;

#[derive(Clone, Debug)]
pub struct TileGrid {
    tiles: Vec<Vec<Tile>>,
    width: usize,
    height: usize,
    tile_w: f32,
    tile_h: f32,
}

impl TileGrid {
    /// Build from rows of tiles. Rows shorter than the first are padded empty.
    pub fn new(mut tiles: Vec<Vec<Tile>>, tile_w: f32, tile_h: f32) -> Self {
        let height = tiles.len();
        let width = tiles.first().map_or(0, |r| r.len());
        for row in &mut tiles {
            row.resize(width, Tile::Empty);
        }
        TileGrid { tiles, width, height, tile_w, tile_h }
    }

    /// Build from level-style text rows (see `Tile::from_char`).
    pub fn from_rows(rows: &[&str], tile_w: f32, tile_h: f32) -> Self {
        let tiles = rows.iter()
            .map(|row| row.chars().map(Tile::from_char).collect())
            .collect();
        Self::new(tiles, tile_w, tile_h)
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    pub fn tile_size(&self) -> (f32, f32) {
        (self.tile_w, self.tile_h)
    }

    /// World-space size of the whole map.
    pub fn world_size(&self) -> (f32, f32) {
        (self.width as f32 * self.tile_w, self.height as f32 * self.tile_h)
    }

    pub fn tile_at(&self, tx: i32, ty: i32) -> Tile {
        if tx < 0 || ty < 0 || tx as usize >= self.width || ty as usize >= self.height {
            return Tile::Empty;
        }
        self.tiles[ty as usize][tx as usize]
    }

    pub fn is_solid(&self, tx: i32, ty: i32) -> bool {
        if tx < 0 || tx as usize >= self.width {
            return true;
        }
        self.tile_at(tx, ty).is_solid()
    }

    /// World-space bounds of a cell.
    pub fn tile_bounds(&self, tx: i32, ty: i32) -> Rect {
        Rect::new(tx as f32 * self.tile_w, ty as f32 * self.tile_h, self.tile_w, self.tile_h)
    }

    /// Cells overlapped by `rect` (right/bottom edges exclusive).
    pub fn cell_span(&self, rect: &Rect) -> (RangeInclusive<i32>, RangeInclusive<i32>) {
        let tx0 = (rect.x / self.tile_w).floor() as i32;
        let tx1 = ((rect.right() / self.tile_w).ceil() as i32 - 1).max(tx0);
        let ty0 = (rect.y / self.tile_h).floor() as i32;
        let ty1 = ((rect.bottom() / self.tile_h).ceil() as i32 - 1).max(ty0);
        (tx0..=tx1, ty0..=ty1)
    }

    /// First solid cell overlapped by `rect`, scanning along `axis` in the
    /// direction of motion (`sign >= 0` = toward +x / +y), so the returned
    /// region is the nearest blocker on the leading side.
    ///
    /// Moving down, a bottom edge lying exactly on a row boundary is contact
    /// with that row: a box that reaches the floor lands on it.
    pub fn first_solid_in(&self, rect: &Rect, axis: Axis, sign: f32) -> Option<Rect> {
        let (xs, ys) = self.cell_span(rect);
        let forward = sign >= 0.0;
        let ys = match axis {
            Axis::Vertical if forward => {
                let touching = (rect.bottom() / self.tile_h).floor() as i32;
                *ys.start()..=(*ys.end()).max(touching)
            }
            _ => ys,
        };

        let ordered = |r: RangeInclusive<i32>| -> Vec<i32> {
            if forward { r.collect() } else { r.rev().collect() }
        };

        match axis {
            Axis::Horizontal => {
                for tx in ordered(xs) {
                    for ty in ys.clone() {
                        if self.is_solid(tx, ty) {
                            return Some(self.tile_bounds(tx, ty));
                        }
                    }
                }
            }
            Axis::Vertical => {
                for ty in ordered(ys) {
                    for tx in xs.clone() {
                        if self.is_solid(tx, ty) {
                            return Some(self.tile_bounds(tx, ty));
                        }
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from(rows: &[&str]) -> TileGrid {
        TileGrid::from_rows(rows, 16.0, 16.0)
    }

    #[test]
    fn ragged_rows_are_padded() {
        let g = grid_from(&["  #", "#"]);
        assert_eq!(g.width(), 3);
        assert!(!g.is_solid(2, 1));
        assert!(g.is_solid(0, 1));
    }

    #[test]
    fn sides_are_walls_top_and_bottom_open() {
        let g = grid_from(&["   "]);
        assert!(g.is_solid(-1, 0));
        assert!(g.is_solid(3, 0));
        assert!(!g.is_solid(1, -1));
        assert!(!g.is_solid(1, 5));
    }

    #[test]
    fn span_excludes_exact_right_edge() {
        let g = grid_from(&["    "]);
        let (xs, ys) = g.cell_span(&Rect::new(0.0, 0.0, 32.0, 16.0));
        assert_eq!(xs, 0..=1);
        assert_eq!(ys, 0..=0);
        let (xs, _) = g.cell_span(&Rect::new(0.5, 0.0, 32.0, 16.0));
        assert_eq!(xs, 0..=2);
    }

    #[test]
    fn first_solid_prefers_leading_side() {
        let g = grid_from(&[
            "    ",
            "#  #",
        ]);
        let wide = Rect::new(0.0, 16.0, 64.0, 16.0);
        let right = g.first_solid_in(&wide, Axis::Horizontal, 1.0).unwrap();
        assert_eq!(right.x, 0.0);
        let left = g.first_solid_in(&wide, Axis::Horizontal, -1.0).unwrap();
        assert_eq!(left.x, 48.0);
    }

    #[test]
    fn vertical_scan_returns_topmost_when_falling() {
        let g = grid_from(&[
            "  ",
            "# ",
            "##",
        ]);
        let tall = Rect::new(0.0, 8.0, 30.0, 40.0);
        let hit = g.first_solid_in(&tall, Axis::Vertical, 1.0).unwrap();
        assert_eq!(hit.y, 16.0);
        let hit_up = g.first_solid_in(&tall, Axis::Vertical, -1.0).unwrap();
        assert_eq!(hit_up.y, 32.0);
    }

    #[test]
    fn bottom_edge_on_row_boundary_touches_that_row() {
        let g = grid_from(&["  ", "  ", "##"]);
        let resting = Rect::new(0.0, 0.0, 14.0, 32.0);
        let hit = g.first_solid_in(&resting, Axis::Vertical, 1.0).unwrap();
        assert_eq!(hit.y, 32.0);
        assert!(g.first_solid_in(&resting, Axis::Vertical, -1.0).is_none());
        assert!(g.first_solid_in(&resting, Axis::Horizontal, 0.0).is_none());
    }

    #[test]
    fn empty_region_has_no_blocker() {
        let g = grid_from(&["   ", "   "]);
        assert!(g.first_solid_in(&Rect::new(4.0, 4.0, 14.0, 20.0), Axis::Vertical, 1.0).is_none());
    }
}
