use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use reqwest::Url;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

use super::client::SnowflakeClient;

/// One request received by [`StubServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        Url::parse(&format!("http://stub{}", self.target))
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

struct CannedResponse {
    status: u16,
    body: Vec<u8>,
}

#[derive(Default)]
struct StubState {
    responses: VecDeque<CannedResponse>,
    requests: Vec<RecordedRequest>,
}

/// Loopback HTTP server answering requests with queued responses, in order.
///
/// Every connection serves a single request and is closed afterwards.
pub struct StubServer {
    base_url: String,
    state: Arc<Mutex<StubState>>,
    accept_loop: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(StubState::default()));
        let accept_loop = tokio::spawn(accept(listener, state.clone()));

        Self {
            base_url,
            state,
            accept_loop,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn client(&self) -> SnowflakeClient {
        SnowflakeClient::direct(&self.base_url).unwrap()
    }

    pub fn respond_json(&self, body: serde_json::Value) -> &Self {
        self.respond(200, body.to_string())
    }

    pub fn respond(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(CannedResponse {
                status,
                body: body.into(),
            });
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

async fn accept(listener: TcpListener, state: Arc<Mutex<StubState>>) {
    while let Ok((stream, _)) = listener.accept().await {
        let state = state.clone();
        tokio::spawn(async move {
            let _ = serve(stream, state).await;
        });
    }
}

async fn serve(mut stream: TcpStream, state: Arc<Mutex<StubState>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut read_buf = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&read_buf[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&read_buf[..n]);
    }
    let body_end = buf.len().min(head_end + content_length);
    let body = buf[head_end..body_end].to_vec();

    let response = {
        let mut state = state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method,
            target,
            headers,
            body,
        });
        state.responses.pop_front()
    }
    .unwrap_or(CannedResponse {
        status: 500,
        body: b"no response queued".to_vec(),
    });

    let head = format!(
        "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        response.status,
        response.body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.shutdown().await
}
