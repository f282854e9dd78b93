//! Tools the bridge serves itself, next to the forwarded upstream tools.

pub mod slash;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::commands::CommandDispatcher;
use crate::error::{BridgeError, Result};
use crate::session::BridgeSession;

/// A tool definition for the MCP tools/list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (e.g., "slash_command")
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonValue,
}

impl ToolDef {
    /// Create a new tool definition.
    pub fn new(name: &str, description: &str, input_schema: JsonValue) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Registry of the local tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
    slash: Option<slash::SlashCommandTool>,
}

impl ToolRegistry {
    /// A registry with no local tools; every call is forwarded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry serving `slash_command` through `dispatcher`.
    pub fn with_slash_commands(dispatcher: CommandDispatcher) -> Self {
        Self {
            tools: slash::tools(),
            slash: Some(slash::SlashCommandTool::new(dispatcher)),
        }
    }

    /// Get all local tool definitions.
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    /// Whether `name` is served locally.
    pub fn handles(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// Dispatch a local tool call. Returns the text of the tool result.
    pub async fn dispatch(
        &self,
        session: &BridgeSession,
        name: &str,
        args: Map<String, JsonValue>,
    ) -> Result<String> {
        match (name, &self.slash) {
            (slash::TOOL_NAME, Some(tool)) => tool.call(session, args).await,
            _ => Err(BridgeError::UnknownTool(name.to_string())),
        }
    }
}

/// Helper macro for creating JSON Schema for tool input parameters.
#[macro_export]
macro_rules! schema {
    // Object whose properties are all required
    (object {
        required: { $($req_name:literal : $req_type:tt),* $(,)? }
    }) => {{
        let mut required = Vec::new();
        $(required.push($req_name);)*

        let mut props = serde_json::Map::new();
        $(props.insert($req_name.to_string(), $crate::schema!(@type $req_type));)*

        serde_json::json!({
            "type": "object",
            "properties": props,
            "required": required
        })
    }};

    // Type mappings
    (@type string) => { serde_json::json!({"type": "string"}) };
}
