use std::sync::atomic::{AtomicU64, Ordering};

use error_stack::{report, ResultExt};
use serde::{Deserialize, Serialize};

use super::{
    client::{RequestId, SessionToken, SnowflakeClient},
    errors::SnowflakeError,
};

const AUTH_ENDPOINT: &str = "/session/v1/login-request";
const SESSION_ENDPOINT: &str = "/session";

const AUTHENTICATOR_JWT: &str = "SNOWFLAKE_JWT";
const CLIENT_APP_ID: &str = env!("CARGO_PKG_NAME");
const CLIENT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session defaults applied at login.
#[derive(Debug, Default, Clone)]
pub struct LoginOptions {
    pub database_name: Option<String>,
    pub schema_name: Option<String>,
    pub warehouse: Option<String>,
    pub role_name: Option<String>,
}

/// Key-pair credentials: the account/user pair and a signed JWT.
#[derive(Debug)]
pub struct KeyPairCredentials {
    pub account_name: String,
    pub login_name: String,
    pub jwt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginParams {
    request_id: RequestId,

    #[serde(skip_serializing_if = "Option::is_none")]
    database_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    schema_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    role_name: Option<String>,
}

impl From<LoginOptions> for LoginParams {
    fn from(value: LoginOptions) -> Self {
        Self {
            request_id: RequestId::new(),
            database_name: value.database_name,
            schema_name: value.schema_name,
            warehouse: value.warehouse,
            role_name: value.role_name,
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest {
    data: LoginBodyData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct ClientEnvironment {
    application: &'static str,
    os: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginBodyData {
    client_app_id: &'static str,
    client_app_version: &'static str,
    client_environment: ClientEnvironment,
    account_name: String,
    login_name: String,
    authenticator: &'static str,
    token: String,
}

impl From<KeyPairCredentials> for LoginBodyData {
    fn from(value: KeyPairCredentials) -> Self {
        Self {
            client_app_id: CLIENT_APP_ID,
            client_app_version: CLIENT_APP_VERSION,
            client_environment: ClientEnvironment {
                application: CLIENT_APP_ID,
                os: std::env::consts::OS,
            },
            account_name: value.account_name,
            login_name: value.login_name,
            authenticator: AUTHENTICATOR_JWT,
            token: value.jwt,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: Option<TokenResponse>,
    message: Option<String>,
    code: Option<String>,
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    message: Option<String>,
    code: Option<String>,
    success: bool,
}

#[derive(Debug, Serialize)]
struct SessionParams {
    delete: bool,
}

/// An authenticated Snowflake session.
#[derive(Debug)]
pub struct Session {
    token: SessionToken,
    sequence: AtomicU64,
}

impl Session {
    pub async fn login(
        client: &SnowflakeClient,
        credentials: KeyPairCredentials,
        opts: LoginOptions,
    ) -> error_stack::Result<Self, SnowflakeError> {
        let params: LoginParams = opts.into();
        let res: LoginResponse = client
            .post(
                AUTH_ENDPOINT,
                &params,
                &LoginRequest {
                    data: credentials.into(),
                },
                /* token = */ None,
            )
            .await?;

        Self::from_response(res)
    }

    fn from_response(res: LoginResponse) -> error_stack::Result<Self, SnowflakeError> {
        if !res.success {
            return Err(report!(SnowflakeError::AuthError {
                code: res.code.unwrap_or_default(),
                message: res.message.unwrap_or_default(),
            }));
        }

        let token = res
            .data
            .and_then(|data| data.token)
            .ok_or_else(|| report!(SnowflakeError::Decode))
            .attach_printable("Login response did not carry a session token")?;

        Ok(Self {
            token: SessionToken::new(token),
            sequence: AtomicU64::new(0),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_token(token: &str) -> Self {
        Self {
            token: SessionToken::new(token.to_string()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Monotonic per-session statement counter, starting at 1.
    pub fn next_sequence_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub async fn close(self, client: &SnowflakeClient) -> error_stack::Result<(), SnowflakeError> {
        let res: StatusResponse = client
            .post(
                SESSION_ENDPOINT,
                &SessionParams { delete: true },
                &serde_json::json!({}),
                Some(&self.token),
            )
            .await?;

        if !res.success {
            return Err(report!(SnowflakeError::AuthError {
                code: res.code.unwrap_or_default(),
                message: res.message.unwrap_or_default(),
            }))
            .attach_printable("Session could not be deleted");
        }
        Ok(())
    }
}
