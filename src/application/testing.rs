use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use error_stack::report;

use crate::{
    domain::{result_table::Cell, result_table::ResultTable, sheets::cell_position::CellPosition},
    ports::{
        spreadsheet::{SpreadsheetError, SpreadsheetHandle, Worksheet},
        warehouse::{Warehouse, WarehouseError},
    },
};

#[derive(Debug)]
struct FakeSheet {
    worksheet: Worksheet,
    cells: BTreeMap<(u32, u32), Cell>,
}

/// Spreadsheet kept in memory. `fail_writes` makes every `update` fail.
#[derive(Debug, Default)]
pub struct InMemorySpreadsheet {
    sheets: Mutex<Vec<FakeSheet>>,
    fail_writes: bool,
}

impl InMemorySpreadsheet {
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn with_sheet(self, title: &str, rows: &[Vec<Cell>]) -> Self {
        let cells = rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(move |(c, cell)| ((r as u32, c as u32), cell.clone()))
            })
            .collect();
        self.sheets.lock().unwrap().push(FakeSheet {
            worksheet: Worksheet {
                sheet_id: None,
                title: title.to_string(),
                row_count: 1000,
                column_count: 26,
            },
            cells,
        });
        self
    }

    pub fn worksheet_size(&self, title: &str) -> Option<(u32, u32)> {
        let sheets = self.sheets.lock().unwrap();
        let sheet = sheets.iter().find(|s| s.worksheet.title == title)?;
        Some((sheet.worksheet.row_count, sheet.worksheet.column_count))
    }

    /// Non-empty cells of `title` as a dense grid trimmed to the last used row and column.
    pub fn contents(&self, title: &str) -> Vec<Vec<Cell>> {
        let sheets = self.sheets.lock().unwrap();
        let Some(sheet) = sheets.iter().find(|s| s.worksheet.title == title) else {
            return vec![];
        };
        let used = sheet.cells.iter().filter(|(_, cell)| **cell != Cell::Null);
        let (rows, cols) = used.fold((0, 0), |(rows, cols), ((r, c), _)| {
            (rows.max(r + 1), cols.max(c + 1))
        });
        (0..rows)
            .map(|r| {
                (0..cols)
                    .map(|c| sheet.cells.get(&(r, c)).cloned().unwrap_or(Cell::Null))
                    .collect()
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SpreadsheetHandle for InMemorySpreadsheet {
    async fn worksheet(
        &self,
        title: &str,
    ) -> error_stack::Result<Option<Worksheet>, SpreadsheetError> {
        Ok(self
            .sheets
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.worksheet.title == title)
            .map(|s| s.worksheet.clone()))
    }

    async fn add_worksheet(
        &self,
        title: &str,
        row_count: u32,
        column_count: u32,
    ) -> error_stack::Result<Worksheet, SpreadsheetError> {
        let mut sheets = self.sheets.lock().unwrap();
        let worksheet = Worksheet {
            sheet_id: Some(sheets.len() as i32),
            title: title.to_string(),
            row_count,
            column_count,
        };
        sheets.push(FakeSheet {
            worksheet: worksheet.clone(),
            cells: BTreeMap::new(),
        });
        Ok(worksheet)
    }

    async fn clear(&self, worksheet: &Worksheet) -> error_stack::Result<(), SpreadsheetError> {
        let mut sheets = self.sheets.lock().unwrap();
        let sheet = sheets
            .iter_mut()
            .find(|s| s.worksheet.title == worksheet.title)
            .ok_or_else(|| report!(SpreadsheetError::FailedToClearWorksheet))?;
        sheet.cells.clear();
        Ok(())
    }

    async fn update(
        &self,
        worksheet: &Worksheet,
        start: CellPosition,
        values: &[Vec<Cell>],
    ) -> error_stack::Result<(), SpreadsheetError> {
        if self.fail_writes {
            return Err(report!(SpreadsheetError::FailedToWriteRange));
        }
        let mut sheets = self.sheets.lock().unwrap();
        let sheet = sheets
            .iter_mut()
            .find(|s| s.worksheet.title == worksheet.title)
            .ok_or_else(|| report!(SpreadsheetError::FailedToWriteRange))?;
        for (r, row) in values.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let position = (start.row.index() + r as u32, start.col.index() + c as u32);
                sheet.cells.insert(position, cell.clone());
            }
        }
        Ok(())
    }
}

/// Warehouse returning a canned result and recording whether it was closed.
#[derive(Debug)]
pub struct FakeWarehouse {
    result: Option<ResultTable>,
    fail_close: bool,
    closed: AtomicBool,
}

impl FakeWarehouse {
    pub fn returning(table: ResultTable) -> Self {
        Self {
            result: Some(table),
            fail_close: false,
            closed: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            fail_close: false,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn closed_flag(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Warehouse for FakeWarehouse {
    async fn execute(&self, _query: &str) -> error_stack::Result<ResultTable, WarehouseError> {
        self.result
            .clone()
            .ok_or_else(|| report!(WarehouseError::Query))
    }

    async fn close(&mut self) -> error_stack::Result<(), WarehouseError> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(report!(WarehouseError::Close));
        }
        Ok(())
    }
}
