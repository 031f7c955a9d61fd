use std::collections::HashMap;
use std::io::Read;

use error_stack::{report, ResultExt};
use flate2::read::GzDecoder;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, ClientBuilder, RequestBuilder, Url,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::trace;
use uuid::Uuid;

use super::errors::SnowflakeError;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const BODY_CONTENT_TYPE: &str = "application/json";
const REQ_ACCEPT: &str = "application/snowflake";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut buf = Uuid::encode_buffer();
        serializer.serialize_str(self.0.hyphenated().encode_lower(&mut buf))
    }
}

/// Session token returned by login, sent on every later request.
#[derive(Clone)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    fn header_value(&self) -> error_stack::Result<HeaderValue, SnowflakeError> {
        HeaderValue::from_str(&format!("Snowflake Token=\"{}\"", self.0))
            .change_context(SnowflakeError::Decode)
            .attach_printable("Session token is not a valid header value")
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionToken(<redacted>)")
    }
}

/// JSON client for one Snowflake account host.
#[derive(Debug, Clone)]
pub struct SnowflakeClient {
    base_url: Url,
    inner: Client,
}

impl SnowflakeClient {
    pub fn new(account: &str) -> error_stack::Result<Self, SnowflakeError> {
        if account.trim().is_empty() {
            return Err(report!(SnowflakeError::InvalidConnectionParameters(
                "account cannot be empty".to_string()
            )));
        }
        Self::with_base_url(&format!("https://{}.snowflakecomputing.com:443", account))
    }

    pub fn with_base_url(base_url: &str) -> error_stack::Result<Self, SnowflakeError> {
        Self::build(base_url, Client::builder())
    }

    /// Client for a loopback server, ignoring any proxy set in the environment.
    #[cfg(test)]
    pub(crate) fn direct(base_url: &str) -> error_stack::Result<Self, SnowflakeError> {
        Self::build(base_url, Client::builder().no_proxy())
    }

    fn build(base_url: &str, builder: ClientBuilder) -> error_stack::Result<Self, SnowflakeError> {
        let base_url = Url::parse(base_url)
            .change_context(SnowflakeError::InvalidConnectionParameters(format!(
                "invalid base url '{}'",
                base_url
            )))?;

        let inner = builder
            .user_agent(APP_USER_AGENT)
            .build()
            .change_context(SnowflakeError::Http)?;

        Ok(Self { base_url, inner })
    }

    pub async fn post<P, B, R>(
        &self,
        path: &str,
        params: &P,
        body: &B,
        token: Option<&SessionToken>,
    ) -> error_stack::Result<R, SnowflakeError>
    where
        P: Serialize + ?Sized,
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let req = self
            .inner
            .post(self.url(path)?)
            .query(params)
            .json(body);
        self.send(req, token).await
    }

    pub async fn get<R>(
        &self,
        path: &str,
        token: Option<&SessionToken>,
    ) -> error_stack::Result<R, SnowflakeError>
    where
        R: DeserializeOwned,
    {
        let req = self.inner.get(self.url(path)?);
        self.send(req, token).await
    }

    /// Downloads a result chunk from its presigned URL, inflating it if gzip compressed.
    pub async fn get_chunk(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> error_stack::Result<Vec<u8>, SnowflakeError> {
        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            header_map.insert(
                HeaderName::from_bytes(name.as_bytes()).change_context(SnowflakeError::Decode)?,
                HeaderValue::from_str(value).change_context(SnowflakeError::Decode)?,
            );
        }

        let res = self
            .inner
            .get(url)
            .headers(header_map)
            .send()
            .await
            .change_context(SnowflakeError::Http)?;
        if !res.status().is_success() {
            return Err(report!(SnowflakeError::HttpStatus(res.status())))
                .attach_printable("Failed to download result chunk");
        }

        let bytes = res.bytes().await.change_context(SnowflakeError::Http)?;
        inflate_if_gzip(&bytes)
    }

    fn url(&self, path: &str) -> error_stack::Result<Url, SnowflakeError> {
        self.base_url
            .join(path)
            .change_context(SnowflakeError::InvalidConnectionParameters(format!(
                "invalid endpoint '{}'",
                path
            )))
    }

    async fn send<R>(
        &self,
        req: RequestBuilder,
        token: Option<&SessionToken>,
    ) -> error_stack::Result<R, SnowflakeError>
    where
        R: DeserializeOwned,
    {
        let mut req = req
            .header(CONTENT_TYPE, HeaderValue::from_static(BODY_CONTENT_TYPE))
            .header(ACCEPT, HeaderValue::from_static(REQ_ACCEPT));
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, token.header_value()?);
        }

        let res = req.send().await.change_context(SnowflakeError::Http)?;
        if !res.status().is_success() {
            return Err(report!(SnowflakeError::HttpStatus(res.status())));
        }

        let res = res.text().await.change_context(SnowflakeError::Http)?;
        trace!(%res, "response");

        serde_json::from_str(&res).change_context(SnowflakeError::Decode)
    }
}

fn inflate_if_gzip(bytes: &[u8]) -> error_stack::Result<Vec<u8>, SnowflakeError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes.to_vec());
    }
    let mut inflated = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut inflated)
        .change_context(SnowflakeError::Decode)
        .attach_printable("Failed to inflate gzip result chunk")?;
    Ok(inflated)
}
