//! Embedded loopback HTTP gateway
//!
//! One listener per process lifetime, bound to 127.0.0.1. Every request
//! runs the same validation gauntlet, first failure wins: Host allow-list
//! (DNS-rebinding defense), exact bearer token, POST only, JSON body.
//! Tool execution failures are wrapped as JSON-RPC errors inside HTTP 200
//! so the agent can tell "the tool failed" from "the transport failed".

mod token;

pub use token::AuthToken;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::rpc::{JsonRpcRequest, JsonRpcResponse, ToolDefinition};
use crate::sanitize;
use crate::store::{CalendarProvider, ContactsDirectory, FullTextIndex, MailStore};
use crate::tools::{tool_catalog, ToolHandler};

/// Host headers accepted on the loopback listener, port stripped
const ALLOWED_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

struct GatewayState {
    token: AuthToken,
    catalog: Vec<ToolDefinition>,
    tools: ToolHandler,
}

/// The embedded HTTP gateway, constructed by the host mail client
pub struct Gateway {
    state: Arc<GatewayState>,
    port: u16,
}

impl Gateway {
    /// Create the gateway. The bearer token is generated and written to
    /// its file here, before any connection can be accepted.
    pub fn new(
        store: Arc<dyn MailStore>,
        contacts: Arc<dyn ContactsDirectory>,
        calendar: Arc<dyn CalendarProvider>,
        fulltext: Arc<dyn FullTextIndex>,
        config: &GatewayConfig,
    ) -> Result<Self> {
        let token = AuthToken::generate(&config.token_file)?;
        let tools = ToolHandler::new(store, contacts, calendar, fulltext);
        Ok(Self {
            state: Arc::new(GatewayState {
                token,
                catalog: tool_catalog(),
                tools,
            }),
            port: config.port,
        })
    }

    /// The current bearer token value
    pub fn token(&self) -> &str {
        self.state.token.value()
    }

    /// The request router, also used directly by tests
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(handle_request))
            .with_state(self.state.clone())
    }

    /// Bind the loopback listener and serve until the task is dropped
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", self.port)).await?;
        info!("Gateway listening on 127.0.0.1:{}", self.port);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_request(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // 1. DNS rebinding protection: validate the Host header
    if !host_allowed(&headers) {
        return (StatusCode::FORBIDDEN, "Forbidden: invalid Host header").into_response();
    }

    // 2. Bearer token authentication
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if authorization != format!("Bearer {}", state.token.value()) {
        return (
            StatusCode::UNAUTHORIZED,
            "Unauthorized: invalid or missing Bearer token",
        )
            .into_response();
    }

    // 3. Method check
    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "POST only").into_response();
    }

    // 4. Body must be a JSON-RPC envelope
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response(),
    };

    let id = request.id.clone();
    match request.method.as_str() {
        "tools/list" => rpc_response(JsonRpcResponse::ok(
            id,
            json!({ "tools": state.catalog }),
        )),
        "tools/call" => {
            let response = match call_tool(&state, request.params).await {
                Ok(result) => JsonRpcResponse::ok(id, result),
                Err(e) => {
                    warn!("Tool call failed: {}", e);
                    JsonRpcResponse::err(id, -32000, e.to_string())
                }
            };
            rpc_response(response)
        }
        other => (
            StatusCode::NOT_FOUND,
            format!("Unknown method: {other}"),
        )
            .into_response(),
    }
}

async fn call_tool(state: &GatewayState, params: Option<Value>) -> Result<Value> {
    let params = params.unwrap_or_else(|| json!({}));
    let name = params["name"]
        .as_str()
        .ok_or_else(|| crate::error::Error::InvalidRequest("Missing tool name".to_string()))?;
    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let result = state.tools.execute(name, &arguments).await?;
    Ok(json!({
        "content": [{
            "type": "text",
            "text": serde_json::to_string_pretty(&result)?,
        }]
    }))
}

/// Serialize a JSON-RPC envelope through the sanitation pipeline and emit
/// it one byte per char, so mail-derived text survives the single-byte
/// transport as valid UTF-8.
fn rpc_response(response: JsonRpcResponse) -> Response {
    let mut value = match serde_json::to_value(&response) {
        Ok(value) => value,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };
    sanitize::encode_value(&mut value);
    let body = sanitize::transport_bytes(&value.to_string());
    (
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        body,
    )
        .into_response()
}

fn host_allowed(headers: &HeaderMap) -> bool {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let hostname = strip_port(host).to_lowercase();
    ALLOWED_HOSTS.contains(&hostname.as_str())
}

/// Strip a trailing port, keeping the bracketed IPv6 form intact
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        match rest.find(']') {
            Some(i) => &host[..i + 2],
            None => host,
        }
    } else {
        match host.rfind(':') {
            Some(i) if !host[i + 1..].is_empty() && host[i + 1..].bytes().all(|b| b.is_ascii_digit()) => {
                &host[..i]
            }
            _ => host,
        }
    }
}
