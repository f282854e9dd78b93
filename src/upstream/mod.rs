//! Clients for the remote MCP servers the bridge forwards to.
//!
//! A [`Transport`] moves JSON-RPC messages; [`UpstreamClient`] layers the MCP
//! handshake and the `tools/*` methods on top of it.

pub mod http;
pub mod stdio;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::ServerEntry;
use crate::error::{BridgeError, Result};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::server::PROTOCOL_VERSION;

/// Client name reported to upstream servers during `initialize`.
const CLIENT_NAME: &str = "mcp-use-bridge";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on `tools/list` pages followed for one listing.
const MAX_TOOL_PAGES: usize = 64;

/// Message-level connection to one upstream server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for the response carrying the same id.
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse>;

    /// Send a notification; no response is read.
    async fn notify(&self, notification: JsonRpcRequest) -> Result<()>;

    /// Release the connection.
    async fn close(&self) -> Result<()>;
}

/// MCP client for one named upstream server.
pub struct UpstreamClient {
    name: String,
    transport: Box<dyn Transport>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl UpstreamClient {
    /// Wrap an already-open transport. No handshake is performed.
    pub fn new(name: &str, transport: Box<dyn Transport>, request_timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            transport,
            next_id: AtomicU64::new(1),
            request_timeout,
        }
    }

    /// Open a transport for `entry` and run the MCP handshake.
    pub async fn connect(name: &str, entry: &ServerEntry, request_timeout: Duration) -> Result<Self> {
        let transport: Box<dyn Transport> = match entry {
            ServerEntry::Stdio { command, args, env } => {
                Box::new(stdio::StdioTransport::spawn(name, command, args, env)?)
            }
            ServerEntry::Http { url, headers } => {
                Box::new(http::HttpTransport::new(name, url, headers)?)
            }
        };

        let client = Self::new(name, transport, request_timeout);
        let info = client.initialize().await?;
        tracing::info!(
            server = %name,
            remote = %info.pointer("/serverInfo/name").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "connected to upstream server"
        );
        Ok(client)
    }

    /// Server name as configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `initialize` followed by `notifications/initialized`.
    pub async fn initialize(&self) -> Result<JsonValue> {
        let result = self
            .call(
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": CLIENT_NAME,
                        "version": CLIENT_VERSION
                    }
                })),
            )
            .await?;

        self.transport
            .notify(JsonRpcRequest::notification("notifications/initialized", None))
            .await?;
        Ok(result)
    }

    /// List every tool the server offers, following `nextCursor` pages.
    pub async fn list_tools(&self) -> Result<Vec<JsonValue>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let result = self.call("tools/list", params).await?;

            match result.get("tools") {
                Some(JsonValue::Array(page)) => tools.extend(page.iter().cloned()),
                _ => {
                    return Err(BridgeError::upstream(
                        &self.name,
                        "tools/list result has no 'tools' array",
                    ))
                }
            }

            cursor = result
                .get("nextCursor")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            if cursor.is_none() {
                return Ok(tools);
            }
        }

        tracing::warn!(server = %self.name, "tools/list pagination limit reached");
        Ok(tools)
    }

    /// Invoke a tool and return the raw `tools/call` result object.
    pub async fn call_tool(&self, name: &str, arguments: Map<String, JsonValue>) -> Result<JsonValue> {
        self.call(
            "tools/call",
            Some(serde_json::json!({
                "name": name,
                "arguments": arguments
            })),
        )
        .await
    }

    /// Close the underlying transport.
    pub async fn shutdown(&self) -> Result<()> {
        self.transport.close().await
    }

    async fn call(&self, method: &str, params: Option<JsonValue>) -> Result<JsonValue> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        tracing::debug!(server = %self.name, method, id, "upstream request");
        let response = tokio::time::timeout(self.request_timeout, self.transport.request(request))
            .await
            .map_err(|_| BridgeError::Timeout(format!("{} on {}", method, self.name)))??;

        response.into_result(&self.name)
    }
}

/// Whether a response id matches the id we sent (servers may echo numbers as strings).
pub(crate) fn same_id(sent: &JsonValue, received: &JsonValue) -> bool {
    if sent == received {
        return true;
    }
    match (sent, received) {
        (JsonValue::Number(n), JsonValue::String(s)) | (JsonValue::String(s), JsonValue::Number(n)) => {
            n.to_string() == *s
        }
        _ => false,
    }
}
