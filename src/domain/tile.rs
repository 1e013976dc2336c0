/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Ground,  // Solid, drawn as terrain
    Brick,   // Solid, drawn as masonry
    Vine,    // Decoration only
}

impl Tile {
    /// Does this tile block movement on both axes?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Ground | Tile::Brick)
    }

    /// Map a level-file character to a tile. Unknown characters are empty.
    pub fn from_char(ch: char) -> Tile {
        match ch {
            '#' => Tile::Ground,
            '=' => Tile::Brick,
            '|' => Tile::Vine,
            _ => Tile::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_terrain_is_solid() {
        assert!(Tile::Ground.is_solid());
        assert!(Tile::Brick.is_solid());
        assert!(!Tile::Vine.is_solid());
        assert!(!Tile::Empty.is_solid());
    }

    #[test]
    fn unknown_chars_are_empty() {
        assert_eq!(Tile::from_char('?'), Tile::Empty);
        assert_eq!(Tile::from_char('#'), Tile::Ground);
    }
}
