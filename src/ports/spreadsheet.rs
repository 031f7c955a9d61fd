use thiserror::Error;

use crate::domain::{result_table::Cell, sheets::cell_position::CellPosition};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetError {
    #[error("Spreadsheet not found")]
    NotFound,
    #[error("Failed to fetch spreadsheet metadata")]
    FailedToFetchMetadata,
    #[error("Failed to add worksheet")]
    FailedToAddWorksheet,
    #[error("Failed to clear worksheet")]
    FailedToClearWorksheet,
    #[error("Failed to write range")]
    FailedToWriteRange,
}

/// A single tab of a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub sheet_id: Option<i32>,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

/// An opened spreadsheet whose worksheets can be looked up, created and overwritten.
#[async_trait::async_trait]
pub trait SpreadsheetHandle: Send + Sync {
    /// Looks up a worksheet by its exact title.
    async fn worksheet(
        &self,
        title: &str,
    ) -> error_stack::Result<Option<Worksheet>, SpreadsheetError>;

    async fn add_worksheet(
        &self,
        title: &str,
        row_count: u32,
        column_count: u32,
    ) -> error_stack::Result<Worksheet, SpreadsheetError>;

    /// Clears every cell value of `worksheet`, keeping its size.
    async fn clear(&self, worksheet: &Worksheet) -> error_stack::Result<(), SpreadsheetError>;

    /// Writes `values` row by row, starting at `start`.
    async fn update(
        &self,
        worksheet: &Worksheet,
        start: CellPosition,
        values: &[Vec<Cell>],
    ) -> error_stack::Result<(), SpreadsheetError>;
}
