use std::ops::Add;

/// Grid position in (column, row) order
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub col: i32,
    pub row: i32,
}

impl Coordinate {
    pub const ZERO: Coordinate = Coordinate::new(0, 0);

    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Componentwise `>=`; both components must hold.
    pub fn dominates(self, other: Self) -> bool {
        self.col >= other.col && self.row >= other.row
    }

    /// Componentwise `<`; both components must hold strictly.
    pub fn before(self, other: Self) -> bool {
        self.col < other.col && self.row < other.row
    }

    /// Whether this position lies inside the grid bounded by
    /// (0, 0) inclusive and `limit` exclusive.
    pub fn in_bounds(self, limit: Self) -> bool {
        self.dominates(Self::ZERO) && self.before(limit)
    }

    /// Row-major linear index.
    pub fn index(self, width: usize) -> usize {
        self.row as usize * width + self.col as usize
    }
}

impl Add for Coordinate {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            col: self.col + other.col,
            row: self.row + other.row,
        }
    }
}
