use std::fmt::Formatter;

use chrono::NaiveDate;
use thiserror::Error;

/// Name of the column appended to every fetched table.
pub const RUN_DATE_COLUMN: &str = "update_date";

/// A single value of a [`ResultTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(value) => write!(f, "{}", value),
            Cell::Float(value) => write!(f, "{}", value),
            Cell::Bool(value) => write!(f, "{}", value),
            Cell::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_owned())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResultTableError {
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Rectangular, header-labeled query result.
///
/// Every row holds exactly one cell per column, in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl ResultTable {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, ResultTableError> {
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != columns.len())
        {
            return Err(ResultTableError::RaggedRow {
                row,
                expected: columns.len(),
                found,
            });
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Sets `name` to `value` on every row.
    ///
    /// A new column is appended at the end unless one with that name already
    /// exists, in which case its values are replaced in place.
    pub fn with_constant_column(mut self, name: &str, value: Cell) -> Self {
        match self.columns.iter().position(|column| column == name) {
            Some(index) => {
                for row in &mut self.rows {
                    row[index] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_owned());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
        self
    }

    /// Stamps every row with `run_date` as an ISO 8601 date in [`RUN_DATE_COLUMN`].
    pub fn with_run_date(self, run_date: NaiveDate) -> Self {
        let stamp = run_date.format("%Y-%m-%d").to_string();
        self.with_constant_column(RUN_DATE_COLUMN, Cell::Text(stamp))
    }

    /// Header row followed by every data row, ready to be written as a block.
    pub fn to_grid(&self) -> Vec<Vec<Cell>> {
        std::iter::once(
            self.columns
                .iter()
                .map(|column| Cell::Text(column.clone()))
                .collect(),
        )
        .chain(self.rows.iter().cloned())
        .collect()
    }
}
