//! Error types for the bridge.
//!
//! Maps upstream, configuration and protocol failures to MCP-friendly error responses.

/// Bridge errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    /// Error reported by (or while talking to) an upstream MCP server.
    #[error("upstream '{server}' error: {message}")]
    Upstream {
        /// Name of the upstream server as configured
        server: String,
        /// Human-readable error message
        message: String,
    },

    /// Server name not present in the configuration file.
    #[error("unknown server '{name}' (configured: {configured})")]
    UnknownServer {
        /// Requested server name
        name: String,
        /// Comma-separated list of configured names
        configured: String,
    },

    /// Unknown tool requested.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArg(String),

    /// Invalid argument value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArg {
        /// Argument name
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Configuration file could not be read or is malformed.
    #[error("config error: {0}")]
    Config(String),

    /// An upstream request did not complete in time.
    #[error("request '{0}' timed out")]
    Timeout(String),

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Shorthand for an upstream failure.
    pub fn upstream(server: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Upstream {
            server: server.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Protocol(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            return BridgeError::Timeout(url);
        }
        BridgeError::Io(format!("HTTP error: {}", err))
    }
}

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl BridgeError {
    /// Convert to JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            BridgeError::UnknownTool(_) => rpc_codes::METHOD_NOT_FOUND,
            BridgeError::MissingArg(_)
            | BridgeError::InvalidArg { .. }
            | BridgeError::UnknownServer { .. } => rpc_codes::INVALID_PARAMS,
            BridgeError::Protocol(_) => rpc_codes::INVALID_REQUEST,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
