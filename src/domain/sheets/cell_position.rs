use super::{column::Column, row::Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    pub col: Column,
    pub row: Row,
}

impl CellPosition {
    /// The top-left cell, `A1`.
    pub fn origin() -> Self {
        CellPosition {
            col: Column::from_index(0),
            row: Row::from_index(0),
        }
    }
}

impl std::fmt::Display for CellPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}
