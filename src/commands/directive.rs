//! Handler replies and the external calls they defer to.

use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Database tool server the prompt commands talk to.
pub const D1_SERVER: &str = "d1-database";
/// Prompt server offering the travel assistant bootstrap tool.
pub const PROMPT_SERVER: &str = "prompt-server";

/// Legacy textual prefix of a directive.
pub const DIRECTIVE_PREFIX: &str = "use_tool_from_server";

/// Post-processing applied to the result of a `/prompts` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptsView {
    List,
    View,
    Dashboard,
    Search,
    Category,
    Create,
    Update,
    Delete,
}

/// Post-processing applied to the result of a `/travel` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelView {
    Default,
    Init,
    FullInit,
    LoadSpecific,
    CustomInit,
}

/// Which formatting routine runs once a deferred result arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Prompts(PromptsView),
    Travel(TravelView),
}

impl FormatKind {
    /// Command family, e.g. `prompts`.
    pub fn category(&self) -> &'static str {
        match self {
            FormatKind::Prompts(_) => "prompts",
            FormatKind::Travel(_) => "travel",
        }
    }

    /// Routine within the family, e.g. `list`.
    pub fn subcategory(&self) -> &'static str {
        match self {
            FormatKind::Prompts(view) => match view {
                PromptsView::List => "list",
                PromptsView::View => "view",
                PromptsView::Dashboard => "dashboard",
                PromptsView::Search => "search",
                PromptsView::Category => "category",
                PromptsView::Create => "create",
                PromptsView::Update => "update",
                PromptsView::Delete => "delete",
            },
            FormatKind::Travel(view) => match view {
                TravelView::Default => "default",
                TravelView::Init => "init",
                TravelView::FullInit => "full_init",
                TravelView::LoadSpecific => "load_specific",
                TravelView::CustomInit => "custom_init",
            },
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category(), self.subcategory())
    }
}

/// A tool call on an upstream server whose result still needs formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub server: String,
    pub operation: String,
    pub arguments: Map<String, JsonValue>,
    pub format: FormatKind,
}

impl Directive {
    /// Call `operation` on `server` with no arguments.
    pub fn new(server: &str, operation: &str, format: FormatKind) -> Self {
        Self {
            server: server.to_string(),
            operation: operation.to_string(),
            arguments: Map::new(),
            format,
        }
    }

    /// Read-only SQL against the D1 database tool.
    pub fn query(sql: impl Into<String>, format: FormatKind) -> Self {
        Self::new(D1_SERVER, "query", format).with_arg("query", sql.into())
    }

    /// Mutating SQL against the D1 database tool.
    pub fn execute(sql: impl Into<String>, format: FormatKind) -> Self {
        Self::new(D1_SERVER, "execute", format).with_arg("query", sql.into())
    }

    /// Add one argument.
    pub fn with_arg(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.arguments.insert(name.to_string(), value.into());
        self
    }

    /// The SQL text, when this is a database directive.
    pub fn sql(&self) -> Option<&str> {
        self.arguments.get("query").and_then(|v| v.as_str())
    }
}

impl fmt::Display for Directive {
    /// `use_tool_from_server <server> <operation> [<json arguments>]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", DIRECTIVE_PREFIX, self.server, self.operation)?;
        if !self.arguments.is_empty() {
            let args = serde_json::to_string(&self.arguments).map_err(|_| fmt::Error)?;
            write!(f, " {}", args)?;
        }
        Ok(())
    }
}

/// What a command handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Final answer, shown as-is.
    Text(String),
    /// An upstream call must run before there is an answer.
    Query(Directive),
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<Directive> for Reply {
    fn from(directive: Directive) -> Self {
        Reply::Query(directive)
    }
}

/// What the dispatcher hands back to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Final text.
    Direct(String),
    /// Run `directive`, then pass its raw result to the tracker under `pending_key`.
    Defer {
        directive: Directive,
        pending_key: String,
    },
}

impl CommandOutput {
    /// Text of a direct reply.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CommandOutput::Direct(text) => Some(text),
            CommandOutput::Defer { .. } => None,
        }
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutput::Direct(text) => f.write_str(text),
            CommandOutput::Defer { directive, .. } => fmt::Display::fmt(directive, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_kind_labels() {
        assert_eq!(FormatKind::Prompts(PromptsView::List).to_string(), "prompts:list");
        assert_eq!(FormatKind::Travel(TravelView::FullInit).to_string(), "travel:full_init");
    }

    #[test]
    fn test_directive_legacy_string() {
        let d = Directive::query("SELECT 1", FormatKind::Prompts(PromptsView::List));
        assert_eq!(
            d.to_string(),
            r#"use_tool_from_server d1-database query {"query":"SELECT 1"}"#
        );

        let d = Directive::new(PROMPT_SERVER, "initialize_travel_assistant", FormatKind::Travel(TravelView::Default));
        assert_eq!(d.to_string(), "use_tool_from_server prompt-server initialize_travel_assistant");
    }

    #[test]
    fn test_directive_quotes_sql_in_json() {
        let d = Directive::execute("DELETE FROM prompts WHERE name = 'a\"b'", FormatKind::Prompts(PromptsView::Delete));
        let text = d.to_string();
        let json = text.splitn(4, ' ').nth(3).unwrap();
        let parsed: JsonValue = serde_json::from_str(json).unwrap();
        assert_eq!(parsed["query"], "DELETE FROM prompts WHERE name = 'a\"b'");
    }
}
