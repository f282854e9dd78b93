//! MCP server implementation.
//!
//! Handles JSON-RPC 2.0 over stdio according to the MCP protocol specification,
//! answering `tools/*` from the upstream session and the local tool registry.

use serde_json::{Map, Value as JsonValue};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::convert;
use crate::error::{rpc_codes, Result};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::session::BridgeSession;
use crate::tools::ToolRegistry;

/// MCP protocol version we support.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server information.
const SERVER_NAME_PREFIX: &str = "mcp-use-";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP server.
pub struct BridgeServer {
    session: BridgeSession,
    registry: ToolRegistry,
    initialized: bool,
}

impl BridgeServer {
    /// Create a new MCP server over the given session and local tools.
    pub fn new(session: BridgeSession, registry: ToolRegistry) -> Self {
        Self {
            session,
            registry,
            initialized: false,
        }
    }

    /// The upstream session.
    pub fn session(&self) -> &BridgeSession {
        &self.session
    }

    /// Whether the client has sent `initialize`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server, reading from stdin and writing to stdout.
    pub async fn run(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                // EOF - client disconnected
                tracing::info!("client disconnected");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    tracing::warn!(error = %e, "unparseable message from client");
                    Some(JsonRpcResponse::error(
                        None,
                        rpc_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications get no response.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Validate JSON-RPC version
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                rpc_codes::INVALID_REQUEST,
                "Invalid JSON-RPC version".to_string(),
            ));
        }

        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification from client");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "tools/list" => self.handle_tools_list(request).await,
            "tools/call" => self.handle_tools_call(request).await,
            "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),
            _ => JsonRpcResponse::error(
                request.id,
                rpc_codes::METHOD_NOT_FOUND,
                format!("Unknown method: {}", request.method),
            ),
        };
        Some(response)
    }

    /// Handle the initialize request.
    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.initialized = true;
        let client = request
            .params
            .as_ref()
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        tracing::info!(client, server = %self.session.primary(), "client initialized bridge");

        JsonRpcResponse::success(
            request.id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": format!("{}{}", SERVER_NAME_PREFIX, self.session.primary()),
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    /// Handle the tools/list request.
    async fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let mut tools = self.session.list_tools().await;
        // Local tools shadow upstream tools of the same name.
        tools.retain(|t| !self.registry.handles(&t.name));
        tools.extend(self.registry.tools().iter().cloned());

        let tools: Vec<JsonValue> = tools
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools }))
    }

    /// Handle the tools/call request.
    async fn handle_tools_call(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        // Extract name and arguments from params
        let params = match &request.params {
            Some(JsonValue::Object(obj)) => obj,
            _ => {
                return JsonRpcResponse::error(
                    request.id,
                    rpc_codes::INVALID_PARAMS,
                    "Missing params object".to_string(),
                )
            }
        };

        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n.to_string(),
            None => {
                return JsonRpcResponse::error(
                    request.id,
                    rpc_codes::INVALID_PARAMS,
                    "Missing 'name' in params".to_string(),
                )
            }
        };

        let arguments = match params.get("arguments") {
            Some(JsonValue::Object(obj)) => obj.clone(),
            Some(JsonValue::Null) | None => Map::new(),
            _ => {
                return JsonRpcResponse::error(
                    request.id,
                    rpc_codes::INVALID_PARAMS,
                    "'arguments' must be an object".to_string(),
                )
            }
        };

        if !self.registry.handles(&name) {
            let output = self.session.call_tool(&name, arguments).await;
            return JsonRpcResponse::success(request.id, output.into_json());
        }

        match self.registry.dispatch(&self.session, &name, arguments).await {
            Ok(text) => JsonRpcResponse::success(request.id, convert::text_result(text, false)),
            Err(err) => {
                tracing::error!(tool = %name, error = %err, "local tool failed");
                JsonRpcResponse::success(request.id, convert::text_result(format!("Error: {}", err), true))
            }
        }
    }
}
