use error_stack::ResultExt;
use google_sheets4::oauth2::{self, authenticator::Authenticator};
use thiserror::Error;
use tracing::instrument;

use super::http_client::{HttpClient, HttpsConnector};

/// Read/write access to spreadsheets plus Drive, needed to open sheets by URL.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

pub type SheetsAuthenticator = Authenticator<HttpsConnector>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetsAuthError {
    #[error("Could not build the HTTPS client")]
    HttpClient,
    #[error("Could not read service account key at '{0}'")]
    KeyfileRead(String),
    #[error("Could not create an authenticator")]
    Authenticator,
    #[error("Service account credentials were rejected")]
    Token,
}

#[instrument(name = "sheets::auth", skip(client))]
pub async fn auth(
    keyfile_path: &str,
    client: HttpClient,
) -> error_stack::Result<SheetsAuthenticator, SheetsAuthError> {
    let secret: oauth2::ServiceAccountKey = oauth2::read_service_account_key(keyfile_path)
        .await
        .change_context_lazy(|| SheetsAuthError::KeyfileRead(keyfile_path.to_string()))?;

    let authenticator = oauth2::ServiceAccountAuthenticator::with_client(secret, client)
        .build()
        .await
        .change_context(SheetsAuthError::Authenticator)?;

    // A key that parses can still be revoked or belong to a deleted account.
    authenticator
        .token(&SCOPES)
        .await
        .change_context(SheetsAuthError::Token)?;

    Ok(authenticator)
}
