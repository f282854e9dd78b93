//! Formatting of deferred query results, per [`FormatKind`].

use serde_json::Value as JsonValue;
use std::fmt::Write;

use super::directive::{FormatKind, PromptsView, TravelView};
use crate::viewer::format::truncate_chars;
use crate::viewer::{dashboard_view, list_view, parse_results, prompt_detail, RawResult, Record};

/// Substrings that mean the database tool itself could not be reached.
const DB_UNREACHABLE_PATTERNS: &[&str] = &[
    "failed to connect",
    "connection error",
    "database error",
    "server error",
    "timeout",
    "not found: d1-database",
];

const PREVIEW_CHARS: usize = 200;
const COMBINED_CHARS: usize = 500;

/// A result that could not be rendered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    /// A field held a value of a shape the view cannot display.
    #[error("field '{field}' holds {found}, expected {expected}")]
    UnexpectedField {
        field: String,
        found: &'static str,
        expected: &'static str,
    },
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// A field that must be text. Absent, null and empty fields are `None`.
fn text_field(record: &Record, field: &str) -> Result<Option<String>, FormatError> {
    match record.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) if s.is_empty() => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(v @ (JsonValue::Number(_) | JsonValue::Bool(_))) => Ok(Some(v.to_string())),
        Some(other) => Err(FormatError::UnexpectedField {
            field: field.to_string(),
            found: json_kind(other),
            expected: "text",
        }),
    }
}

/// A count column, which D1 may hand back as a number or as a numeric string.
fn count_field(record: &Record) -> Result<u64, FormatError> {
    let unexpected = |found| FormatError::UnexpectedField {
        field: "count".to_string(),
        found,
        expected: "a non-negative integer",
    };
    match record.get("count") {
        None | Some(JsonValue::Null) => Ok(0),
        Some(JsonValue::Number(n)) => n.as_u64().ok_or_else(|| unexpected("a number")),
        Some(JsonValue::String(s)) => s.trim().parse().map_err(|_| unexpected("a string")),
        Some(other) => Err(unexpected(json_kind(other))),
    }
}

/// Render `raw` for the routine named by `kind`.
pub fn format_result(kind: FormatKind, raw: &RawResult) -> Result<String, FormatError> {
    match kind {
        FormatKind::Prompts(view) => format_prompts(view, raw),
        FormatKind::Travel(view) => format_travel(view, raw),
    }
}

fn format_prompts(view: PromptsView, raw: &RawResult) -> Result<String, FormatError> {
    if let RawResult::Text(text) = raw {
        let lower = text.to_lowercase();
        if DB_UNREACHABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
            return Ok(format!(
                "❌ Database Error: {}\n\n\
                 Please ensure the D1 database server is running and accessible.\n\
                 You can check available servers with `/servers` command.",
                text
            ));
        }
    }

    if let Some((verb, past)) = write_verbs(view) {
        return Ok(if raw.contains_ignore_case("error") {
            format!("❌ Failed to {} prompt: {}", verb, raw.to_text())
        } else {
            format!("✅ Prompt {} successfully.", past)
        });
    }

    let rows = parse_results(raw);
    if rows.is_empty() && raw.contains_ignore_case("error") {
        return Ok(format!("❌ Database query failed: {}", raw.to_text()));
    }

    let out = match view {
        PromptsView::List | PromptsView::Dashboard if rows.is_empty() => {
            "No prompts found in the database. The prompts table may be empty \
             or there was an error connecting to the database."
                .to_string()
        }
        PromptsView::List => list_view(&rows),
        PromptsView::Dashboard => dashboard_view(&rows),
        PromptsView::View => match rows.first() {
            Some(row) => prompt_detail(row),
            None => "Prompt not found. Please check the prompt name and try again.".to_string(),
        },
        PromptsView::Search if rows.is_empty() => {
            "No prompts found matching your search criteria.".to_string()
        }
        PromptsView::Search => list_view(&rows),
        PromptsView::Category => match rows.first() {
            Some(first) if first.contains_key("count") => category_summary(&rows)?,
            Some(_) => list_view(&rows),
            None => "No prompts found in this category.".to_string(),
        },
        PromptsView::Create | PromptsView::Update | PromptsView::Delete => raw.to_text(),
    };
    Ok(out)
}

fn write_verbs(view: PromptsView) -> Option<(&'static str, &'static str)> {
    match view {
        PromptsView::Create => Some(("create", "created")),
        PromptsView::Update => Some(("update", "updated")),
        PromptsView::Delete => Some(("delete", "deleted")),
        _ => None,
    }
}

fn category_summary(rows: &[Record]) -> Result<String, FormatError> {
    let mut out = String::from("# Prompt Categories\n\n");
    for row in rows {
        let category = text_field(row, "category")?.unwrap_or_else(|| "Unknown".to_string());
        let _ = writeln!(out, "- **{}**: {} prompts", category, count_field(row)?);
    }
    Ok(out)
}

fn format_travel(view: TravelView, raw: &RawResult) -> Result<String, FormatError> {
    match view {
        TravelView::Default => {
            let text = raw.to_text();
            let lower = text.to_lowercase();
            if lower.contains("pricing") || lower.contains("tier") {
                let preview: String = text.chars().take(PREVIEW_CHARS).collect();
                Ok(format!(
                    "⚠️ **Unexpected Response from Prompt Server**\n\n\
                     The prompt server returned a pricing system prompt instead of the travel assistant.\n\n\
                     **Try these alternatives:**\n\
                     1. `/travel db` - Load from database\n\
                     2. `/travel check` - See available prompts\n\
                     3. `/travel setup` - Use setup wizard\n\
                     4. `/travel load <prompt_name>` - Load specific prompt\n\n\
                     **Received:**\n{}...",
                    preview
                ))
            } else {
                Ok(format!("✅ **Travel Assistant Initialized**\n\n{}", text))
            }
        }

        TravelView::Init => {
            let rows = parse_results(raw);
            match first_content(&rows)? {
                Some(content) => Ok(format!(
                    "✅ **Travel Assistant Loaded from Database**\n\n{}",
                    content
                )),
                None => Ok("❌ No travel assistant prompt found in database.\n\n\
                            Please create one with:\n\
                            `/prompts create travel_assistant_system`"
                    .to_string()),
            }
        }

        TravelView::FullInit => {
            let rows = parse_results(raw);
            if rows.is_empty() {
                return Ok("❌ No travel prompts found in database.".to_string());
            }
            let mut out = String::from("✅ **Travel Assistant Components Loaded**\n\n");
            for row in &rows {
                let name = text_field(row, "name")?.unwrap_or_else(|| "Unknown".to_string());
                let content = text_field(row, "content")?.unwrap_or_default();
                let preview: String = content.chars().take(PREVIEW_CHARS).collect();
                let _ = write!(out, "**{}**\n{}...\n\n", name, preview);
            }
            Ok(out)
        }

        TravelView::LoadSpecific => {
            let rows = parse_results(raw);
            match first_content(&rows)? {
                Some(content) => Ok(format!("✅ **Prompt Loaded Successfully**\n\n{}", content)),
                None => Ok("❌ Prompt not found. Check the name and try again.".to_string()),
            }
        }

        TravelView::CustomInit => {
            let rows = parse_results(raw);
            if rows.is_empty() {
                return Ok("❌ No matching components found in database.".to_string());
            }
            let mut out = String::from("✅ **Custom Travel Assistant Initialized**\n\n**Loaded Components:**\n");
            let mut contents = Vec::with_capacity(rows.len());
            for row in &rows {
                let name = text_field(row, "name")?.unwrap_or_else(|| "Unknown".to_string());
                let _ = writeln!(out, "- {}", name);
                contents.push(text_field(row, "content")?.unwrap_or_default());
            }
            let combined = truncate_chars(&contents.join("\n\n---\n\n"), COMBINED_CHARS);
            let _ = write!(out, "\n**Combined Instructions:**\n{}", combined);
            Ok(out)
        }
    }
}

fn first_content(rows: &[Record]) -> Result<Option<String>, FormatError> {
    match rows.first() {
        Some(row) => text_field(row, "content"),
        None => Ok(None),
    }
}
