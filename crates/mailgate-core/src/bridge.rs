//! stdio ↔ HTTP bridge
//!
//! Reads newline-delimited JSON-RPC from stdin, answers the protocol
//! handshake locally, forwards everything else to the gateway over
//! loopback HTTP, and writes responses back to stdout in completion
//! order. Each input line runs as its own task; a bounded output channel
//! and a single flushing writer give downstream backpressure. Transport
//! failures become JSON-RPC error responses, never crashes.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::rpc::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use crate::sanitize;

/// Output lines buffered before tasks start waiting on the writer
const OUTPUT_QUEUE_DEPTH: usize = 16;

/// The bridge process state, cheap to clone into per-line tasks
#[derive(Clone)]
pub struct Bridge {
    endpoint: String,
    token_file: PathBuf,
    timeout: Duration,
    client: reqwest::Client,
}

impl Bridge {
    pub fn new(config: &Config) -> Self {
        Self {
            endpoint: format!("http://localhost:{}/", config.gateway.port),
            token_file: config.gateway.token_file.clone(),
            timeout: Duration::from_secs(config.bridge.request_timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Serve stdin until EOF, then drain pending tasks and return.
    pub async fn run(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let (tx, rx) = mpsc::channel::<String>(OUTPUT_QUEUE_DEPTH);
        let writer = tokio::spawn(write_output(rx));
        let mut tasks = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let bridge = self.clone();
            let tx = tx.clone();
            tasks.spawn(async move {
                if let Some(out) = bridge.handle_line(&line).await {
                    // A closed channel means the agent side is gone
                    let _ = tx.send(out).await;
                }
            });
        }

        debug!("stdin closed, draining {} pending task(s)", tasks.len());
        drop(tx);
        while tasks.join_next().await.is_some() {}
        writer.await.map_err(|e| Error::Other(e.to_string()))?;
        info!("Bridge finished");
        Ok(())
    }

    /// Handle one input line. `None` means no output (notification).
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        match self.process(line).await {
            Ok(Some(envelope)) => serde_json::to_string(&envelope).ok(),
            Ok(None) => None,
            Err(e) => {
                let response = JsonRpcResponse::err(
                    extract_id(line),
                    -32700,
                    format!("Bridge error: {e}"),
                );
                serde_json::to_string(&response).ok()
            }
        }
    }

    async fn process(&self, line: &str) -> Result<Option<Value>> {
        let request: JsonRpcRequest = serde_json::from_str(line)?;
        match request.method.as_str() {
            "initialize" => Ok(Some(json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "result": {
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": crate::APP_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }
            }))),
            "notifications/initialized" | "notifications/cancelled" => Ok(None),
            "resources/list" => Ok(Some(json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "result": { "resources": [] }
            }))),
            "prompts/list" => Ok(Some(json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "result": { "prompts": [] }
            }))),
            _ => self.forward(&request).await.map(Some),
        }
    }

    /// Forward a request to the gateway and pass its envelope through
    /// unchanged in shape.
    async fn forward(&self, request: &JsonRpcRequest) -> Result<Value> {
        let token = self.read_token()?;
        let body = serde_json::to_string(request)?;

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let bytes = response.bytes().await.map_err(classify)?;
        let text = String::from_utf8_lossy(&bytes);
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            // Second chance: raw control characters in a message body can
            // leak through and break the first parse
            Err(_) => serde_json::from_str(&sanitize::repair_json(&text))
                .map_err(|e| Error::Other(format!("Invalid JSON from mail client: {e}"))),
        }
    }

    /// Reread the token file on every forward so a gateway restart only
    /// costs one failed call.
    fn read_token(&self) -> Result<String> {
        std::fs::read_to_string(&self.token_file)
            .map(|s| s.trim().to_string())
            .map_err(|e| Error::Token {
                path: self.token_file.display().to_string(),
                reason: e.to_string(),
            })
    }
}

async fn write_output(mut rx: mpsc::Receiver<String>) {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = rx.recv().await {
        if stdout.write_all(line.as_bytes()).await.is_err() {
            return;
        }
        if stdout.write_all(b"\n").await.is_err() {
            return;
        }
        if stdout.flush().await.is_err() {
            return;
        }
    }
}

fn classify(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Connection(e.to_string())
    }
}

/// Best-effort id recovery for error responses on lines that never made
/// it through a full parse
fn extract_id(line: &str) -> Option<Value> {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .filter(|id| !id.is_null())
}
