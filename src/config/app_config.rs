use std::path::{Path, PathBuf};

use error_stack::{report, ResultExt};
use serde::Deserialize;
use serde_path_to_error::{Deserializer as PathDeserializer, Segment, Track};
use thiserror::Error;
use tracing::instrument;

use super::{sheets_config::SpreadsheetConfig, snowflake_config::SnowflakeConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
pub const DEFAULT_QUERY_PATH: &str = "query.sql";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),
    #[error("Error reading config file")]
    Read,
    #[error("Failed to deserialize config field '{0}'")]
    Deserialize(String),
    #[error("Missing value for required key '{0}'")]
    MissingValue(&'static str),
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(flatten)]
    pub snowflake: SnowflakeConfig,
    #[serde(flatten)]
    pub sheets: SpreadsheetConfig,
    #[serde(default, rename = "query_path", alias = "QUERY_PATH")]
    pub query_path: Option<Box<str>>,
}

/// `$CONFIG_PATH`, or [`DEFAULT_CONFIG_PATH`] when unset.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl AppConfig {
    #[instrument(name = "AppConfig::load")]
    pub fn load(path: &Path) -> error_stack::Result<Self, ConfigError> {
        let result = Self::read(path);
        match &result {
            Ok(_) => tracing::info!("Loaded {} successfully.", path.display()),
            Err(report) => tracing::error!("Error loading {}: {:?}", path.display(), report),
        }
        result
    }

    pub fn query_path(&self) -> &Path {
        Path::new(self.query_path.as_deref().unwrap_or(DEFAULT_QUERY_PATH))
    }

    fn read(path: &Path) -> error_stack::Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(report!(ConfigError::NotFound(path.display().to_string())));
        }

        let value = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .change_context(ConfigError::Read)
            .attach_printable_lazy(|| format!("Config file: {}", path.display()))?
            .try_deserialize::<serde_json::Value>()
            .change_context(ConfigError::Read)?;

        let config = Self::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    fn from_value(value: serde_json::Value) -> error_stack::Result<Self, ConfigError> {
        use serde::de::IntoDeserializer;
        let mut track = Track::new();
        let path_de = PathDeserializer::new(value.into_deserializer(), &mut track);
        AppConfig::deserialize(path_de).map_err(|e| {
            let path_str = track
                .path()
                .iter()
                .map(|seg| match seg {
                    Segment::Seq { index } => format!("[{}]", index),
                    Segment::Map { key } => format!(".{}", key),
                    Segment::Enum { variant } => format!("::{}", variant),
                    Segment::Unknown => String::from("<?>"),
                })
                .collect::<String>();
            report!(ConfigError::Deserialize(
                path_str.trim_start_matches('.').to_string()
            ))
            .attach_printable(e.to_string())
        })
    }

    fn validate(&self) -> error_stack::Result<(), ConfigError> {
        let required: [(&'static str, &str); 9] = [
            ("SNOWFLAKE_ACCOUNT", &*self.snowflake.account),
            ("SNOWFLAKE_USER", &*self.snowflake.user),
            ("SNOWFLAKE_WAREHOUSE", &*self.snowflake.warehouse),
            ("SNOWFLAKE_DATABASE", &*self.snowflake.database),
            ("SNOWFLAKE_SCHEMA", &*self.snowflake.schema),
            ("RSA_KEY_PATH", &*self.snowflake.private_key_path),
            ("GOOGLE_KEYFILE_PATH", &*self.sheets.keyfile_path),
            ("SPREADSHEET_URL", &*self.sheets.spreadsheet_url),
            ("SHEET_NAME", &*self.sheets.sheet_name),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((key, _)) => Err(report!(ConfigError::MissingValue(key))),
            None => Ok(()),
        }
    }
}
