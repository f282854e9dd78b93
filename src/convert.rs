//! Conversion between upstream MCP payloads and what the bridge serves.
//!
//! Covers tool descriptors from `tools/list`, `tools/call` result objects,
//! and argument extraction for the local tools.

use serde_json::{Map, Value as JsonValue};

use crate::error::{BridgeError, Result};
use crate::tools::ToolDef;
use crate::viewer::RawResult;

/// Schema served when an upstream tool describes none.
fn default_schema() -> JsonValue {
    serde_json::json!({ "type": "object" })
}

/// Whether `value` is plausibly a JSON Schema for tool input.
fn looks_like_schema(value: &JsonValue) -> bool {
    match value {
        JsonValue::Object(map) => map.contains_key("type") || map.contains_key("properties"),
        _ => false,
    }
}

/// Convert one upstream tool descriptor. Returns `None` when it has no name.
///
/// Some servers put the complete input schema under `annotations`; that wins
/// over `inputSchema` only when it actually looks like a schema.
pub fn upstream_tool_def(tool: &JsonValue) -> Option<ToolDef> {
    let name = tool.get("name").and_then(|v| v.as_str())?;

    let description = tool
        .get("description")
        .and_then(|v| v.as_str())
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string())
        .unwrap_or_else(|| format!("Tool: {}", name));

    let schema = match (tool.get("annotations"), tool.get("inputSchema")) {
        (Some(annotations), _) if looks_like_schema(annotations) => {
            tracing::debug!(tool = name, "using annotations schema");
            strip_nulls(annotations.clone())
        }
        (_, Some(input)) if input.is_object() => input.clone(),
        _ => {
            tracing::warn!(tool = name, "no schema found for tool, using default");
            default_schema()
        }
    };

    Some(ToolDef {
        name: name.to_string(),
        description,
        input_schema: schema,
    })
}

fn strip_nulls(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Text of a `tools/call` result: content items joined with newlines.
///
/// Items carrying `text` contribute it; any other item is serialized whole.
pub fn content_text(result: &JsonValue) -> String {
    match result {
        JsonValue::String(s) => s.clone(),
        JsonValue::Object(map) => match map.get("content") {
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| match item.get("text").and_then(|t| t.as_str()) {
                    Some(text) => text.to_string(),
                    None => item.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => result.to_string(),
        },
        other => other.to_string(),
    }
}

/// Whether an upstream `tools/call` result flags itself as an error.
pub fn result_is_error(result: &JsonValue) -> bool {
    result.get("isError").and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Raw result of a directive, preferring `structuredContent` when present.
pub fn result_to_raw(result: &JsonValue) -> RawResult {
    match result.get("structuredContent") {
        Some(structured) if !structured.is_null() => RawResult::from_json(structured.clone()),
        _ => RawResult::Text(content_text(result)),
    }
}

/// A `tools/call` result holding one text item.
pub fn text_result(text: impl Into<String>, is_error: bool) -> JsonValue {
    serde_json::json!({
        "content": [{
            "type": "text",
            "text": text.into()
        }],
        "isError": is_error
    })
}

/// Helper to get a required string argument from JSON arguments.
pub fn get_string_arg(args: &Map<String, JsonValue>, name: &str) -> Result<String> {
    match args.get(name) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(_) => Err(BridgeError::InvalidArg {
            name: name.to_string(),
            reason: "Expected a string".to_string(),
        }),
        None => Err(BridgeError::MissingArg(name.to_string())),
    }
}
