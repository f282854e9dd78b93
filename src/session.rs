//! Bridge session management.
//!
//! Owns the upstream connections: the bridged (primary) server, connected at
//! startup, and any other configured server a command targets, connected on
//! first use.

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::commands::CommandContext;
use crate::config::BridgeConfig;
use crate::convert;
use crate::error::Result;
use crate::tools::ToolDef;
use crate::upstream::UpstreamClient;
use crate::viewer::RawResult;

/// Text and error flag of a forwarded tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    /// The MCP `tools/call` result object.
    pub fn into_json(self) -> JsonValue {
        convert::text_result(self.text, self.is_error)
    }
}

/// Bridge session state.
pub struct BridgeSession {
    config: BridgeConfig,
    primary: String,
    request_timeout: Duration,
    clients: Mutex<HashMap<String, Arc<UpstreamClient>>>,
}

impl BridgeSession {
    /// Create a session without connecting. Fails if `primary` is not configured.
    pub fn new(config: BridgeConfig, primary: &str, request_timeout: Duration) -> Result<Self> {
        config.server(primary)?;
        Ok(Self {
            config,
            primary: primary.to_string(),
            request_timeout,
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// Create a session and connect to the primary server.
    pub async fn connect(config: BridgeConfig, primary: &str, request_timeout: Duration) -> Result<Self> {
        let session = Self::new(config, primary, request_timeout)?;
        session.client_for(primary).await?;
        Ok(session)
    }

    /// Use an already-connected client for the server it is named after.
    pub async fn attach(&self, client: UpstreamClient) {
        let name = client.name().to_string();
        self.clients.lock().await.insert(name, Arc::new(client));
    }

    /// Name of the bridged server.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// What command handlers may know about the servers.
    pub fn command_context(&self) -> CommandContext {
        CommandContext {
            servers: self.config.server_names(),
            active_server: Some(self.primary.clone()),
        }
    }

    /// The client for `name`, connecting it if this is the first use.
    pub async fn client_for(&self, name: &str) -> Result<Arc<UpstreamClient>> {
        if let Some(client) = self.clients.lock().await.get(name) {
            return Ok(client.clone());
        }

        // The map lock is not held while connecting.
        let entry = self.config.server(name)?;
        tracing::info!(server = %name, "connecting to upstream server");
        let client = Arc::new(UpstreamClient::connect(name, entry, self.request_timeout).await?);

        let (kept, extra) = {
            let mut clients = self.clients.lock().await;
            match clients.get(name) {
                Some(existing) => (existing.clone(), Some(client)),
                None => {
                    clients.insert(name.to_string(), client.clone());
                    (client, None)
                }
            }
        };
        // A concurrent first use connected too; keep the first client registered.
        if let Some(extra) = extra {
            if let Err(err) = extra.shutdown().await {
                tracing::debug!(server = %name, error = %err, "error closing duplicate connection");
            }
        }
        Ok(kept)
    }

    /// Tools of the primary server. Upstream failures yield an empty list.
    pub async fn list_tools(&self) -> Vec<ToolDef> {
        let listed = match self.client_for(&self.primary).await {
            Ok(client) => client.list_tools().await,
            Err(err) => Err(err),
        };

        match listed {
            Ok(tools) => {
                let defs: Vec<ToolDef> = tools.iter().filter_map(convert::upstream_tool_def).collect();
                if defs.len() != tools.len() {
                    tracing::warn!(skipped = tools.len() - defs.len(), "upstream tools without a name skipped");
                }
                tracing::debug!(server = %self.primary, count = defs.len(), "listed upstream tools");
                defs
            }
            Err(err) => {
                tracing::error!(server = %self.primary, error = %err, "failed to list tools");
                Vec::new()
            }
        }
    }

    /// Forward a tool call to the primary server.
    pub async fn call_tool(&self, name: &str, arguments: Map<String, JsonValue>) -> ToolOutput {
        tracing::info!(server = %self.primary, tool = name, "forwarding tool call");
        let result = match self.client_for(&self.primary).await {
            Ok(client) => client.call_tool(name, arguments).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(result) => ToolOutput {
                text: convert::content_text(&result),
                is_error: convert::result_is_error(&result),
            },
            Err(err) => {
                tracing::error!(tool = name, error = %err, "failed to call tool");
                ToolOutput {
                    text: format!("Error: {}", err),
                    is_error: true,
                }
            }
        }
    }

    /// Run `operation` on `server` and return its raw result.
    pub async fn invoke(
        &self,
        server: &str,
        operation: &str,
        arguments: Map<String, JsonValue>,
    ) -> Result<RawResult> {
        let client = self.client_for(server).await?;
        tracing::info!(server, tool = operation, "running deferred command");
        let result = client.call_tool(operation, arguments).await?;
        if convert::result_is_error(&result) {
            tracing::warn!(server, tool = operation, "upstream tool reported an error");
        }
        Ok(convert::result_to_raw(&result))
    }

    /// Shut down every connected upstream server.
    pub async fn close_all(&self) {
        let clients: Vec<Arc<UpstreamClient>> = self.clients.lock().await.drain().map(|(_, c)| c).collect();
        for client in clients {
            if let Err(err) = client.shutdown().await {
                tracing::warn!(server = %client.name(), error = %err, "error closing upstream server");
            }
        }
    }
}
