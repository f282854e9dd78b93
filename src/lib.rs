//! # mcp-use-bridge
//!
//! MCP (Model Context Protocol) stdio bridge to remote MCP servers.
//!
//! A desktop client launches the bridge as a local stdio server. The bridge
//! connects to one configured upstream server (spawned over stdio or reached
//! over HTTP/SSE) and forwards `tools/list` and `tools/call` to it.
//!
//! ## Features
//!
//! - **Tool forwarding**: upstream tools are re-served with normalized schemas
//! - **Slash commands**: an optional local `slash_command` tool runs commands
//!   such as `/prompts dashboard` or `/travel`, calls the upstream tool they
//!   defer to, and formats the result as Markdown
//! - **Lazy connections**: other configured servers are connected on first use
//!
//! ## Usage
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "prompts": {
//!       "command": "/path/to/mcp-use-bridge",
//!       "args": ["--config", "/path/to/servers.json", "--server", "d1-database", "--slash-commands"]
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! The command pipeline works without any transport:
//!
//! ```
//! use mcp_use_bridge::commands::{CommandContext, CommandDispatcher, CommandOutput};
//!
//! let dispatcher = CommandDispatcher::with_builtins();
//! let out = dispatcher.execute("/prompts list", &CommandContext::default());
//! if let CommandOutput::Defer { pending_key, .. } = out {
//!     let text = dispatcher.resolve(&pending_key, r#"[{"name": "a", "category": "travel"}]"#);
//!     assert!(text.starts_with("# Available Prompts"));
//! }
//! ```

pub mod commands;
pub mod config;
mod convert;
mod error;
pub mod jsonrpc;
mod server;
mod session;
mod tools;
pub mod upstream;
pub mod viewer;

pub use config::{BridgeConfig, ServerEntry};
pub use error::{BridgeError, Result};
pub use jsonrpc::{JsonRpcRequest, JsonRpcResponse};
pub use server::{BridgeServer, PROTOCOL_VERSION};
pub use session::{BridgeSession, ToolOutput};
pub use tools::{ToolDef, ToolRegistry};
pub use upstream::{Transport, UpstreamClient};
