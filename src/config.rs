//! Bridge configuration file.
//!
//! Uses the same `mcpServers` layout desktop clients use:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "d1-database": { "command": "npx", "args": ["-y", "d1-mcp"] },
//!     "prompt-server": { "url": "https://prompts.example.com/mcp" }
//!   }
//! }
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{BridgeError, Result};

/// How to reach one upstream server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServerEntry {
    /// Spawn a child process and speak JSON-RPC over its stdio.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// POST JSON-RPC to a streamable HTTP endpoint.
    Http {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(rename = "mcpServers", default)]
    servers: BTreeMap<String, ServerEntry>,
}

impl BridgeConfig {
    /// Read and parse a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("cannot read '{}': {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: BridgeConfig =
            serde_json::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))?;
        if config.servers.is_empty() {
            return Err(BridgeError::Config("no servers under \"mcpServers\"".to_string()));
        }
        Ok(config)
    }

    /// Look up a server entry by name.
    pub fn server(&self, name: &str) -> Result<&ServerEntry> {
        self.servers
            .get(name)
            .ok_or_else(|| BridgeError::UnknownServer {
                name: name.to_string(),
                configured: self.server_names().join(", "),
            })
    }

    /// Configured server names, sorted.
    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }
}
