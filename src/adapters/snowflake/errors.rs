use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnowflakeError {
    #[error("Invalid connection parameters: {0}")]
    InvalidConnectionParameters(String),

    #[error("Failed to sign key-pair JWT")]
    JwtSigning,

    #[error("HTTP request failed")]
    Http,

    #[error("Request errored with status code: {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Failed to decode Snowflake response")]
    Decode,

    #[error("Snowflake authentication error ({code}): {message}")]
    AuthError { code: String, message: String },

    #[error("Snowflake query error ({code}): {message}")]
    QueryError { code: String, message: String },

    #[error("Malformed result set: {0}")]
    MalformedResult(String),

    #[error("Session is closed")]
    SessionClosed,
}
