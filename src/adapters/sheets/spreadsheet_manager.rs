use std::fmt::Debug;

use error_stack::{report, ResultExt};
use google_sheets4::{
    api::{
        AddSheetRequest, BatchUpdateSpreadsheetRequest, ClearValuesRequest, GridProperties,
        Request, SheetProperties, ValueRange,
    },
    Sheets,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument};

use crate::{
    domain::{
        result_table::Cell,
        sheets::{
            a1_notation::{A1Notation, ToA1Notation},
            cell_position::CellPosition,
        },
    },
    ports::spreadsheet::{SpreadsheetError, SpreadsheetHandle, Worksheet},
};

use super::{
    auth::{self, SheetsAuthError, SCOPES},
    http_client::{self, HttpsConnector},
    value_range_factory::ValueRangeFactory,
};

lazy_static! {
    static ref URL_KEY_PATTERNS: [Regex; 2] = [
        Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("valid spreadsheet url pattern"),
        Regex::new(r"key=([a-zA-Z0-9_-]+)").expect("valid spreadsheet key pattern"),
    ];
}

/// Extracts the spreadsheet key from a Google Sheets URL.
pub fn spreadsheet_key_from_url(url: &str) -> Option<String> {
    URL_KEY_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .map(|captures| captures[1].to_string())
}

/// Authorized Sheets API hub, not yet bound to a spreadsheet.
pub struct SheetsClient {
    hub: Sheets<HttpsConnector>,
}

impl Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SheetsClient")
    }
}

impl SheetsClient {
    /// Builds a service-account client from the JSON key file at `keyfile_path`.
    #[instrument(name = "SheetsClient::authorize")]
    pub async fn authorize(keyfile_path: &str) -> error_stack::Result<Self, SheetsAuthError> {
        let client = http_client::http_client()?;
        let auth = auth::auth(keyfile_path, client.clone()).await?;
        info!("Google Sheets client authorized.");
        Ok(Self {
            hub: Sheets::new(client, auth),
        })
    }

    /// Opens the spreadsheet at `url`, checking that it is reachable with these credentials.
    #[instrument(name = "SheetsClient::open_by_url", skip(self))]
    pub async fn open_by_url(
        self,
        url: &str,
    ) -> error_stack::Result<SpreadsheetManager, SpreadsheetError> {
        let spreadsheet_id = spreadsheet_key_from_url(url)
            .ok_or_else(|| report!(SpreadsheetError::NotFound))
            .attach_printable_lazy(|| format!("No spreadsheet key in url '{}'", url))?;

        let manager = SpreadsheetManager {
            spreadsheet_id,
            hub: self.hub,
        };
        manager
            .worksheets()
            .await
            .change_context(SpreadsheetError::NotFound)
            .attach_printable_lazy(|| format!("Spreadsheet {} is not accessible", url))?;

        Ok(manager)
    }
}

/// A single opened spreadsheet.
pub struct SpreadsheetManager {
    spreadsheet_id: String,
    hub: Sheets<HttpsConnector>,
}

impl Debug for SpreadsheetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SpreadsheetManager {{ spreadsheet_id: {:?} }}",
            self.spreadsheet_id
        )
    }
}

impl SpreadsheetManager {
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    #[instrument]
    async fn worksheets(&self) -> error_stack::Result<Vec<Worksheet>, SpreadsheetError> {
        let (_, spreadsheet) = self
            .hub
            .spreadsheets()
            .get(&self.spreadsheet_id)
            .add_scopes(SCOPES)
            .doit()
            .await
            .change_context(SpreadsheetError::FailedToFetchMetadata)?;

        Ok(spreadsheet
            .sheets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|sheet| sheet.properties)
            .filter_map(worksheet_from_properties)
            .collect())
    }
}

fn worksheet_from_properties(properties: SheetProperties) -> Option<Worksheet> {
    let grid = properties.grid_properties.unwrap_or_default();
    let dimension = |value: Option<i32>| value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0);

    Some(Worksheet {
        sheet_id: properties.sheet_id,
        title: properties.title?,
        row_count: dimension(grid.row_count),
        column_count: dimension(grid.column_count),
    })
}

fn add_sheet_request(title: &str, row_count: u32, column_count: u32) -> BatchUpdateSpreadsheetRequest {
    let dimension = |value: u32| i32::try_from(value).unwrap_or(i32::MAX);

    BatchUpdateSpreadsheetRequest {
        requests: Some(vec![Request {
            add_sheet: Some(AddSheetRequest {
                properties: Some(SheetProperties {
                    title: Some(title.to_string()),
                    grid_properties: Some(GridProperties {
                        row_count: Some(dimension(row_count)),
                        column_count: Some(dimension(column_count)),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl SpreadsheetHandle for SpreadsheetManager {
    #[instrument]
    async fn worksheet(
        &self,
        title: &str,
    ) -> error_stack::Result<Option<Worksheet>, SpreadsheetError> {
        Ok(self
            .worksheets()
            .await?
            .into_iter()
            .find(|worksheet| worksheet.title == title))
    }

    #[instrument]
    async fn add_worksheet(
        &self,
        title: &str,
        row_count: u32,
        column_count: u32,
    ) -> error_stack::Result<Worksheet, SpreadsheetError> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .batch_update(
                add_sheet_request(title, row_count, column_count),
                &self.spreadsheet_id,
            )
            .add_scopes(SCOPES)
            .doit()
            .await
            .change_context(SpreadsheetError::FailedToAddWorksheet)
            .attach_printable_lazy(|| format!("Failed to add worksheet '{}'", title))?;

        let added = response
            .replies
            .unwrap_or_default()
            .into_iter()
            .find_map(|reply| reply.add_sheet?.properties)
            .and_then(worksheet_from_properties);

        // Fall back to the requested shape when the reply omits the new properties.
        Ok(added.unwrap_or_else(|| Worksheet {
            sheet_id: None,
            title: title.to_string(),
            row_count,
            column_count,
        }))
    }

    #[instrument]
    async fn clear(&self, worksheet: &Worksheet) -> error_stack::Result<(), SpreadsheetError> {
        let range = A1Notation::whole_sheet(&worksheet.title);
        self.hub
            .spreadsheets()
            .values_clear(ClearValuesRequest::default(), &self.spreadsheet_id, range.as_ref())
            .add_scopes(SCOPES)
            .doit()
            .await
            .map(|_| ())
            .change_context(SpreadsheetError::FailedToClearWorksheet)
            .attach_printable_lazy(|| format!("Failed to clear range {}", range))
    }

    #[instrument(skip(values), fields(rows = values.len()))]
    async fn update(
        &self,
        worksheet: &Worksheet,
        start: CellPosition,
        values: &[Vec<Cell>],
    ) -> error_stack::Result<(), SpreadsheetError> {
        let range = start.to_a1_notation(Some(&worksheet.title));
        self.hub
            .spreadsheets()
            .values_update(ValueRange::from_rows(values), &self.spreadsheet_id, range.as_ref())
            .value_input_option("RAW")
            .add_scopes(SCOPES)
            .doit()
            .await
            .map(|_| ())
            .change_context(SpreadsheetError::FailedToWriteRange)
            .attach_printable_lazy(|| format!("Failed to write to range {}", range))
    }
}
