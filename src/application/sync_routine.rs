use std::future::Future;
use std::path::Path;

use chrono::NaiveDate;
use error_stack::ResultExt;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::{
    adapters::{
        query_file::load_query,
        sheets::spreadsheet_manager::{SheetsClient, SpreadsheetManager},
        snowflake::{connection::SnowflakeConnection, key_material::load_private_key_base64},
    },
    config::app_config::AppConfig,
    domain::result_table::ResultTable,
    ports::{
        spreadsheet::SpreadsheetHandle,
        warehouse::{Warehouse, WarehouseError},
    },
};

use super::sheet_writer::SheetWriter;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutineError {
    #[error("Failed to load the query")]
    Query,
    #[error("Failed to load the warehouse private key")]
    KeyMaterial,
    #[error("Failed to fetch data from the warehouse")]
    Fetch,
    #[error("Failed to open the spreadsheet")]
    Spreadsheet,
}

/// Runs `query`, then closes `warehouse` whether or not the query succeeded.
///
/// A failed close is logged and does not affect the returned result.
pub async fn fetch_and_close<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    query: &str,
) -> error_stack::Result<ResultTable, WarehouseError> {
    let result = warehouse.execute(query).await;
    if let Err(report) = warehouse.close().await {
        warn!("Error closing Snowflake connection: {:?}", report);
    }
    result
}

/// Fetches the query result and stamps every row with `run_date`.
pub async fn extract<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    query: &str,
    run_date: NaiveDate,
) -> error_stack::Result<ResultTable, WarehouseError> {
    Ok(fetch_and_close(warehouse, query)
        .await?
        .with_run_date(run_date))
}

pub async fn load<S: SpreadsheetHandle + ?Sized>(
    spreadsheet: &S,
    sheet_name: &str,
    table: &ResultTable,
) -> bool {
    SheetWriter::new(spreadsheet)
        .overwrite(sheet_name, table)
        .await
}

/// Extracts `query` from `warehouse`, then opens the spreadsheet and overwrites `sheet_name`.
///
/// `spreadsheet` is only awaited once the data has been fetched.
pub async fn sync<W, S, F>(
    warehouse: &mut W,
    spreadsheet: F,
    query: &str,
    sheet_name: &str,
    run_date: NaiveDate,
) -> error_stack::Result<bool, RoutineError>
where
    W: Warehouse + ?Sized,
    S: SpreadsheetHandle,
    F: Future<Output = error_stack::Result<S, RoutineError>>,
{
    let table = extract(warehouse, query, run_date)
        .await
        .change_context(RoutineError::Fetch)?;

    let spreadsheet = spreadsheet.await?;
    Ok(load(&spreadsheet, sheet_name, &table).await)
}

/// Copies one Snowflake query result into one Google Sheets worksheet.
#[derive(Debug)]
pub struct SnowflakeToSheetsRoutine {
    config: AppConfig,
    run_date: NaiveDate,
}

impl SnowflakeToSheetsRoutine {
    pub fn new(config: AppConfig, run_date: NaiveDate) -> Self {
        Self { config, run_date }
    }

    pub fn name(&self) -> &str {
        "SnowflakeToSheets"
    }

    /// Returns whether the worksheet was written.
    ///
    /// Every step before the write propagates its error; a failed write only
    /// yields `false`.
    #[instrument(name = "SnowflakeToSheetsRoutine::run", skip(self), fields(run_date = %self.run_date))]
    pub async fn run(&self) -> error_stack::Result<bool, RoutineError> {
        let query = load_query(self.config.query_path()).change_context(RoutineError::Query)?;

        let key_material =
            load_private_key_base64(Path::new(&*self.config.snowflake.private_key_path))
                .change_context(RoutineError::KeyMaterial)?;

        let mut warehouse = SnowflakeConnection::connect(&self.config.snowflake, &key_material)
            .await
            .change_context(RoutineError::Fetch)?;

        sync(
            &mut warehouse,
            self.open_spreadsheet(),
            &query,
            &self.config.sheets.sheet_name,
            self.run_date,
        )
        .await
    }

    async fn open_spreadsheet(&self) -> error_stack::Result<SpreadsheetManager, RoutineError> {
        let sheets = &self.config.sheets;
        let result = match SheetsClient::authorize(&sheets.keyfile_path).await {
            Ok(client) => client
                .open_by_url(&sheets.spreadsheet_url)
                .await
                .change_context(RoutineError::Spreadsheet),
            Err(report) => Err(report.change_context(RoutineError::Spreadsheet)),
        };

        match &result {
            Ok(spreadsheet) => info!(
                "Opened Google Spreadsheet {}.",
                spreadsheet.spreadsheet_id()
            ),
            Err(report) => error!("Could not open spreadsheet: {:?}", report),
        }
        result
    }
}
