#[derive(serde::Deserialize, Debug, Clone)]
pub struct SpreadsheetConfig {
    /// Service account JSON key file.
    #[serde(rename = "google_keyfile_path", alias = "GOOGLE_KEYFILE_PATH")]
    pub keyfile_path: Box<str>,
    #[serde(rename = "spreadsheet_url", alias = "SPREADSHEET_URL")]
    pub spreadsheet_url: Box<str>,
    #[serde(rename = "sheet_name", alias = "SHEET_NAME")]
    pub sheet_name: Box<str>,
}
