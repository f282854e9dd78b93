//! Normalization of external query results into [`Record`]s.

use serde_json::{Map, Value as JsonValue};

/// One row of a query result.
pub type Record = Map<String, JsonValue>;

/// Substrings that mark a textual result as an error report.
const ERROR_PATTERNS: &[&str] = &[
    "connection failed",
    "database error",
    "query failed",
    "server error",
    "not found",
    "timeout",
    "failed to connect",
];

/// Nesting limit for JSON documents that wrap JSON in a string.
const MAX_STRING_NESTING: usize = 4;

/// A query result as received at the host boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// Unstructured text (which may still contain JSON or a pipe table).
    Text(String),
    /// Already a sequence of rows.
    List(Vec<Record>),
    /// Already a single mapping.
    Map(Record),
}

impl RawResult {
    /// Classify a structured JSON value. Non-object array elements are dropped;
    /// scalars become text.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Array(items) => {
                let total = items.len();
                let records: Vec<Record> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        JsonValue::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect();
                if records.len() != total {
                    tracing::warn!(dropped = total - records.len(), "non-object rows dropped from result");
                }
                RawResult::List(records)
            }
            JsonValue::Object(map) => RawResult::Map(map),
            JsonValue::String(s) => RawResult::Text(s),
            other => RawResult::Text(other.to_string()),
        }
    }

    /// The payload as text, for pass-through and error reporting.
    pub fn to_text(&self) -> String {
        match self {
            RawResult::Text(s) => s.clone(),
            RawResult::List(rows) => serde_json::to_string_pretty(rows).unwrap_or_default(),
            RawResult::Map(map) => serde_json::to_string_pretty(map).unwrap_or_default(),
        }
    }

    /// Case-insensitive substring test over the textual form.
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        self.to_text().to_lowercase().contains(&needle.to_lowercase())
    }
}

impl From<&str> for RawResult {
    fn from(text: &str) -> Self {
        RawResult::Text(text.to_string())
    }
}

impl From<String> for RawResult {
    fn from(text: String) -> Self {
        RawResult::Text(text)
    }
}

/// Normalize a result into rows. Never fails: anything unusable yields an empty vector.
pub fn parse_results(raw: &RawResult) -> Vec<Record> {
    match raw {
        RawResult::List(rows) => rows.clone(),
        RawResult::Map(map) => parse_map(map),
        RawResult::Text(text) => parse_text(text, 0),
    }
}

fn parse_map(map: &Record) -> Vec<Record> {
    if let Some(error) = map.get("error") {
        tracing::error!(error = %error, "database returned error");
        return Vec::new();
    }
    for field in ["results", "rows"] {
        if let Some(JsonValue::Array(rows)) = map.get(field) {
            return match RawResult::from_json(JsonValue::Array(rows.clone())) {
                RawResult::List(records) => records,
                _ => Vec::new(),
            };
        }
    }
    vec![map.clone()]
}

fn parse_text(text: &str, depth: usize) -> Vec<Record> {
    let lower = text.to_lowercase();
    if let Some(pattern) = ERROR_PATTERNS.iter().find(|p| lower.contains(*p)) {
        tracing::warn!(pattern, result = %text, "database error detected");
        return Vec::new();
    }

    match serde_json::from_str::<JsonValue>(text.trim()) {
        Ok(JsonValue::String(inner)) if depth < MAX_STRING_NESTING => parse_text(&inner, depth + 1),
        Ok(value @ (JsonValue::Array(_) | JsonValue::Object(_))) => {
            parse_results(&RawResult::from_json(value))
        }
        Ok(_) => {
            tracing::debug!(result = %text, "scalar result has no rows");
            Vec::new()
        }
        Err(_) => parse_pipe_table(text),
    }
}

/// Rows separating a table header from its body, e.g. `|---|:---:|` or `+----+`.
fn is_separator_row(line: &str) -> bool {
    let line = line.trim();
    line.contains('-') && line.chars().all(|c| matches!(c, '-' | '|' | ':' | '+' | ' '))
}

fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a `|`-delimited table. Rows whose cell count differs from the header's are dropped.
pub fn parse_pipe_table(text: &str) -> Vec<Record> {
    let mut lines = text
        .lines()
        .filter(|line| line.contains('|') && !is_separator_row(line));

    let headers = match lines.next() {
        Some(line) => split_cells(line),
        None => return Vec::new(),
    };
    if headers.is_empty() {
        return Vec::new();
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let cells = split_cells(line);
        if cells.len() != headers.len() {
            dropped += 1;
            continue;
        }
        let record: Record = headers
            .iter()
            .cloned()
            .zip(cells.into_iter().map(JsonValue::String))
            .collect();
        rows.push(record);
    }

    if dropped > 0 {
        tracing::debug!(dropped, "table rows with mismatched cell count dropped");
    }
    rows
}
