use std::path::Path;

use error_stack::ResultExt;
use thiserror::Error;
use tracing::{error, info, instrument};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryFileError {
    #[error("Error reading query file: {0}")]
    Read(String),
}

/// Reads the SQL text at `path` as-is.
#[instrument(name = "load_query")]
pub fn load_query(path: &Path) -> error_stack::Result<String, QueryFileError> {
    let result = std::fs::read_to_string(path)
        .change_context_lazy(|| QueryFileError::Read(path.display().to_string()));
    match &result {
        Ok(_) => info!("Loaded query from {}.", path.display()),
        Err(report) => error!("Error loading query file: {:?}", report),
    }
    result
}
