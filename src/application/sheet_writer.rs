use error_stack::ResultExt;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::{
    domain::{result_table::ResultTable, sheets::cell_position::CellPosition},
    ports::spreadsheet::SpreadsheetHandle,
};

pub const MIN_NEW_SHEET_ROWS: u32 = 100;
pub const MIN_NEW_SHEET_COLUMNS: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetWriteError {
    #[error("Failed to look up worksheet '{0}'")]
    Lookup(String),
    #[error("Failed to prepare worksheet '{0}'")]
    Prepare(String),
    #[error("Failed to write data to worksheet '{0}'")]
    Write(String),
}

/// Size of a worksheet created for `table`: room for the header and every row,
/// never smaller than 100 x 10.
pub fn new_worksheet_size(table: &ResultTable) -> (u32, u32) {
    let needed = |count: usize| u32::try_from(count).unwrap_or(u32::MAX).saturating_add(1);
    (
        needed(table.row_count()).max(MIN_NEW_SHEET_ROWS),
        needed(table.column_count()).max(MIN_NEW_SHEET_COLUMNS),
    )
}

/// Replaces the contents of one worksheet with a [`ResultTable`].
pub struct SheetWriter<'a, S: SpreadsheetHandle + ?Sized> {
    spreadsheet: &'a S,
}

impl<'a, S: SpreadsheetHandle + ?Sized> SheetWriter<'a, S> {
    pub fn new(spreadsheet: &'a S) -> Self {
        Self { spreadsheet }
    }

    /// Overwrites `sheet_name` with the header and rows of `table`.
    ///
    /// Returns `false` instead of an error when any step fails; nothing already
    /// cleared or written is rolled back.
    #[instrument(
        name = "SheetWriter::overwrite",
        skip(self, table),
        fields(rows = table.row_count(), columns = table.column_count())
    )]
    pub async fn overwrite(&self, sheet_name: &str, table: &ResultTable) -> bool {
        match self.try_overwrite(sheet_name, table).await {
            Ok(()) => {
                info!("Data successfully written to sheet '{}'.", sheet_name);
                true
            }
            Err(report) => {
                error!("Failed to write data to sheet '{}': {:?}", sheet_name, report);
                false
            }
        }
    }

    pub async fn try_overwrite(
        &self,
        sheet_name: &str,
        table: &ResultTable,
    ) -> error_stack::Result<(), SheetWriteError> {
        let existing = self
            .spreadsheet
            .worksheet(sheet_name)
            .await
            .change_context_lazy(|| SheetWriteError::Lookup(sheet_name.to_string()))?;

        let worksheet = match existing {
            Some(worksheet) => {
                self.spreadsheet
                    .clear(&worksheet)
                    .await
                    .change_context_lazy(|| SheetWriteError::Prepare(sheet_name.to_string()))?;
                info!("Sheet '{}' cleared.", sheet_name);
                worksheet
            }
            None => {
                let (rows, columns) = new_worksheet_size(table);
                let worksheet = self
                    .spreadsheet
                    .add_worksheet(sheet_name, rows, columns)
                    .await
                    .change_context_lazy(|| SheetWriteError::Prepare(sheet_name.to_string()))?;
                info!("Created new sheet '{}' ({}x{}).", sheet_name, rows, columns);
                worksheet
            }
        };

        self.spreadsheet
            .update(&worksheet, CellPosition::origin(), &table.to_grid())
            .await
            .change_context_lazy(|| SheetWriteError::Write(sheet_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{application::testing::InMemorySpreadsheet, domain::result_table::Cell};

    fn report_table() -> ResultTable {
        ResultTable::new(
            vec!["id".to_string(), "amount".to_string()],
            vec![
                vec![Cell::Int(1), Cell::Int(10)],
                vec![Cell::Int(2), Cell::Int(20)],
            ],
        )
        .unwrap()
        .with_run_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn text(value: &str) -> Cell {
        Cell::from(value)
    }

    #[test]
    fn test_new_worksheet_size_has_minimums() {
        assert_eq!(new_worksheet_size(&report_table()), (100, 10));

        let wide = ResultTable::new((0..12).map(|i| format!("c{}", i)).collect(), vec![]).unwrap();
        assert_eq!(new_worksheet_size(&wide), (100, 13));

        let long = ResultTable::new(vec!["id".to_string()], vec![vec![Cell::Int(0)]; 150]).unwrap();
        assert_eq!(new_worksheet_size(&long), (151, 10));
    }

    #[tokio::test]
    async fn test_report_scenario() {
        let spreadsheet = InMemorySpreadsheet::default();
        let written = SheetWriter::new(&spreadsheet)
            .overwrite("Report", &report_table())
            .await;

        assert!(written);
        assert_eq!(
            spreadsheet.contents("Report"),
            vec![
                vec![text("id"), text("amount"), text("update_date")],
                vec![Cell::Int(1), Cell::Int(10), text("2024-01-01")],
                vec![Cell::Int(2), Cell::Int(20), text("2024-01-01")],
            ]
        );
    }

    #[tokio::test]
    async fn test_existing_sheet_has_no_residue() {
        let stale: Vec<Vec<Cell>> = (0..50)
            .map(|r| (0..8).map(|c| text(&format!("old-{}-{}", r, c))).collect())
            .collect();
        let spreadsheet = InMemorySpreadsheet::default().with_sheet("Report", &stale);

        assert!(SheetWriter::new(&spreadsheet)
            .overwrite("Report", &report_table())
            .await);

        let contents = spreadsheet.contents("Report");
        assert_eq!(contents, report_table().to_grid());
        // Existing sheets keep their size.
        assert_eq!(spreadsheet.worksheet_size("Report"), Some((1000, 26)));
    }

    #[tokio::test]
    async fn test_missing_sheet_is_created_with_minimum_size() {
        let spreadsheet = InMemorySpreadsheet::default().with_sheet("Other", &[vec![text("keep")]]);

        assert!(SheetWriter::new(&spreadsheet)
            .overwrite("Report", &report_table())
            .await);

        assert_eq!(spreadsheet.worksheet_size("Report"), Some((100, 10)));
        assert_eq!(spreadsheet.contents("Report"), report_table().to_grid());
        assert_eq!(spreadsheet.contents("Other"), vec![vec![text("keep")]]);
    }

    #[tokio::test]
    async fn test_write_failure_returns_false() {
        let spreadsheet = InMemorySpreadsheet::default().with_failing_writes();
        let writer = SheetWriter::new(&spreadsheet);

        assert!(!writer.overwrite("Report", &report_table()).await);

        let report = writer
            .try_overwrite("Report", &report_table())
            .await
            .unwrap_err();
        assert_eq!(
            report.current_context(),
            &SheetWriteError::Write("Report".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_table_writes_header_only() {
        let table = ResultTable::new(vec!["id".to_string()], vec![])
            .unwrap()
            .with_run_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let spreadsheet = InMemorySpreadsheet::default();

        assert!(SheetWriter::new(&spreadsheet).overwrite("Report", &table).await);
        assert_eq!(
            spreadsheet.contents("Report"),
            vec![vec![text("id"), text("update_date")]]
        );
    }
}
