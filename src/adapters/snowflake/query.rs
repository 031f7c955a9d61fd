use std::collections::HashMap;
use std::time::Duration;

use error_stack::{report, ResultExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::result_table::{Cell, ResultTable};

use super::{
    cells::{normalize_column_name, to_cell, RowType},
    client::{RequestId, SnowflakeClient},
    errors::SnowflakeError,
    session::Session,
};

const QUERY_ENDPOINT: &str = "/queries/v1/query-request";

const QUERY_IN_PROGRESS_CODE: &str = "333333";
const QUERY_IN_PROGRESS_ASYNC_CODE: &str = "333334";
const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const JSON_RESULT_FORMAT: &str = "json";

const SSE_C_ALGORITHM_HEADER: &str = "x-amz-server-side-encryption-customer-algorithm";
const SSE_C_KEY_HEADER: &str = "x-amz-server-side-encryption-customer-key";
const SSE_C_AES: &str = "AES256";

type RawRow = Vec<Option<String>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams {
    request_id: RequestId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct QueryBodyParameters {
    go_query_result_format: &'static str,
}

impl Default for QueryBodyParameters {
    fn default() -> Self {
        Self {
            go_query_result_format: JSON_RESULT_FORMAT,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    sql_text: &'a str,
    async_exec: bool,
    sequence_id: u64,
    is_internal: bool,
    describe_only: bool,
    parameters: QueryBodyParameters,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: Option<QueryData>,
    message: Option<String>,
    code: Option<String>,
    success: bool,
}

impl QueryResponse {
    fn is_in_progress(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some(QUERY_IN_PROGRESS_CODE) | Some(QUERY_IN_PROGRESS_ASYNC_CODE)
        )
    }

    fn result_url(&self) -> Option<&str> {
        self.data.as_ref()?.get_result_url.as_deref()
    }

    fn into_data(self) -> error_stack::Result<QueryData, SnowflakeError> {
        if !self.success {
            return Err(report!(SnowflakeError::QueryError {
                code: self.code.unwrap_or_default(),
                message: self.message.unwrap_or_default(),
            }));
        }
        self.data
            .ok_or_else(|| report!(SnowflakeError::MalformedResult("response has no data".to_string())))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    query_id: Option<String>,
    get_result_url: Option<String>,
    query_result_format: Option<String>,

    #[serde(default)]
    rowtype: Vec<RowType>,

    #[serde(default)]
    rowset: Vec<RawRow>,

    #[serde(default)]
    chunks: Vec<ChunkInfo>,

    chunk_headers: Option<HashMap<String, String>>,
    qrmk: Option<String>,
}

impl QueryData {
    /// Headers needed to download the remaining result chunks.
    fn chunk_download_headers(&self) -> HashMap<String, String> {
        if let Some(headers) = &self.chunk_headers {
            return headers.clone();
        }
        match &self.qrmk {
            Some(qrmk) => HashMap::from([
                (SSE_C_ALGORITHM_HEADER.to_string(), SSE_C_AES.to_string()),
                (SSE_C_KEY_HEADER.to_string(), qrmk.clone()),
            ]),
            None => HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkInfo {
    url: String,
    row_count: Option<usize>,
}

/// Runs `sql` synchronously on `session` and collects every row of the result.
pub async fn query(
    client: &SnowflakeClient,
    session: &Session,
    sql: &str,
) -> error_stack::Result<ResultTable, SnowflakeError> {
    let body = QueryBody {
        sql_text: sql,
        async_exec: false,
        sequence_id: session.next_sequence_id(),
        is_internal: false,
        describe_only: false,
        parameters: QueryBodyParameters::default(),
    };
    let params = QueryParams {
        request_id: RequestId::new(),
    };

    let mut res: QueryResponse = client
        .post(QUERY_ENDPOINT, &params, &body, Some(session.token()))
        .await?;

    while res.is_in_progress() {
        let result_url = res
            .result_url()
            .ok_or_else(|| {
                report!(SnowflakeError::MalformedResult(
                    "in-progress query without a result url".to_string()
                ))
            })?
            .to_owned();
        debug!(%result_url, "Query still running, polling for result");
        tokio::time::sleep(RESULT_POLL_INTERVAL).await;
        res = client.get(&result_url, Some(session.token())).await?;
    }

    let mut data = res.into_data()?;
    check_result_format(&data)?;
    debug!(
        query_id = data.query_id.as_deref().unwrap_or_default(),
        rows = data.rowset.len(),
        chunks = data.chunks.len(),
        "Query finished"
    );

    let headers = data.chunk_download_headers();
    let mut rows = std::mem::take(&mut data.rowset);
    for (index, chunk) in data.chunks.iter().enumerate() {
        let bytes = client
            .get_chunk(&chunk.url, &headers)
            .await
            .attach_printable_lazy(|| format!("chunk {}", index))?;
        let chunk_rows = parse_chunk(&bytes)?;
        if let Some(expected) = chunk.row_count {
            if expected != chunk_rows.len() {
                return Err(report!(SnowflakeError::MalformedResult(format!(
                    "chunk {} has {} rows, expected {}",
                    index,
                    chunk_rows.len(),
                    expected
                ))));
            }
        }
        rows.extend(chunk_rows);
    }

    build_table(&data.rowtype, rows)
}

fn check_result_format(data: &QueryData) -> error_stack::Result<(), SnowflakeError> {
    match data.query_result_format.as_deref() {
        None => Ok(()),
        Some(format) if format.eq_ignore_ascii_case(JSON_RESULT_FORMAT) => Ok(()),
        Some(format) => Err(report!(SnowflakeError::MalformedResult(format!(
            "unsupported result format '{}'",
            format
        )))),
    }
}

/// Chunk bodies are a comma-separated sequence of row arrays without the outer brackets.
fn parse_chunk(bytes: &[u8]) -> error_stack::Result<Vec<RawRow>, SnowflakeError> {
    let mut wrapped = Vec::with_capacity(bytes.len() + 2);
    wrapped.push(b'[');
    wrapped.extend_from_slice(bytes);
    wrapped.push(b']');

    serde_json::from_slice(&wrapped)
        .change_context(SnowflakeError::Decode)
        .attach_printable("Result chunk is not a JSON row sequence")
}

fn build_table(
    rowtype: &[RowType],
    rows: Vec<RawRow>,
) -> error_stack::Result<ResultTable, SnowflakeError> {
    let columns = rowtype
        .iter()
        .map(|column| normalize_column_name(&column.name))
        .collect();

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != rowtype.len() {
                return Err(report!(SnowflakeError::MalformedResult(format!(
                    "row {} has {} values, expected {}",
                    index,
                    row.len(),
                    rowtype.len()
                ))));
            }
            Ok(rowtype
                .iter()
                .zip(row.iter())
                .map(|(column, value)| to_cell(column, value.as_deref()))
                .collect::<Vec<Cell>>())
        })
        .collect::<error_stack::Result<Vec<_>, SnowflakeError>>()?;

    ResultTable::new(columns, rows)
        .change_context(SnowflakeError::MalformedResult("ragged result set".to_string()))
}
