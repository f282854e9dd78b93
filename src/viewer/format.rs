//! Markdown views over prompt records.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt::Write;

use super::parse::Record;

/// Returned by every view when there is nothing to show.
pub const NO_RESULTS: &str = "No prompts found.";

const UNCATEGORIZED: &str = "Uncategorized";
const NO_DESCRIPTION: &str = "No description";
const DASHBOARD_DESCRIPTION_WIDTH: usize = 50;

/// Metadata fields shown at the bottom of the detail view, in this order.
const METADATA_FIELDS: &[&str] = &["created_at", "updated_at", "version", "author"];

/// Render a field value as display text. `None` for absent or null fields.
pub fn field_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

fn field_or(record: &Record, field: &str, default: &str) -> String {
    field_text(record, field).unwrap_or_else(|| default.to_string())
}

/// Tags may arrive as an array, a JSON-encoded array string, or a comma-delimited string.
fn tags_text(record: &Record) -> Option<String> {
    let tags = match record.get("tags")? {
        JsonValue::String(s) => match serde_json::from_str::<JsonValue>(s) {
            Ok(JsonValue::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                .collect::<Vec<_>>(),
            _ => s.split(',').map(|t| t.trim().to_string()).collect(),
        },
        JsonValue::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
            .collect(),
        _ => return None,
    };

    let tags: Vec<String> = tags.into_iter().filter(|t| !t.is_empty()).collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(", "))
    }
}

/// Group records by category, categories and names both sorted.
fn group_by_category(records: &[Record]) -> BTreeMap<String, Vec<&Record>> {
    let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records {
        groups
            .entry(field_or(record, "category", UNCATEGORIZED))
            .or_default()
            .push(record);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|r| field_text(r, "name").unwrap_or_default());
    }
    groups
}

/// Truncate to `width` characters, appending `...` when anything was cut.
pub fn truncate_chars(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let mut cut: String = text.chars().take(width).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// Bulleted list of prompts, one section per category.
pub fn list_view(records: &[Record]) -> String {
    if records.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut out = String::from("# Available Prompts\n\n");
    for (category, group) in group_by_category(records) {
        let _ = writeln!(out, "## {}\n", category);
        for record in group {
            let _ = writeln!(
                out,
                "- **{}**: {}",
                field_or(record, "name", "Unnamed"),
                field_or(record, "description", NO_DESCRIPTION)
            );
        }
        out.push('\n');
    }
    out
}

/// Full rendering of the first record.
pub fn detail_view(records: &[Record]) -> String {
    match records.first() {
        Some(record) => prompt_detail(record),
        None => NO_RESULTS.to_string(),
    }
}

/// Full rendering of one prompt.
pub fn prompt_detail(record: &Record) -> String {
    let content = field_text(record, "content")
        .or_else(|| field_text(record, "prompt"))
        .unwrap_or_else(|| "No content".to_string());

    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", field_or(record, "name", "Unnamed Prompt"));
    let _ = writeln!(out, "**Category:** {}", field_or(record, "category", UNCATEGORIZED));
    let _ = writeln!(out, "**Description:** {}", field_or(record, "description", NO_DESCRIPTION));
    if let Some(tags) = tags_text(record) {
        let _ = writeln!(out, "**Tags:** {}", tags);
    }
    let _ = writeln!(out, "\n## Content\n\n```\n{}\n```", content);

    let metadata: Vec<String> = METADATA_FIELDS
        .iter()
        .filter_map(|field| field_text(record, field).map(|value| format!("{}: {}", field, value)))
        .collect();
    if !metadata.is_empty() {
        out.push_str("\n## Metadata\n\n");
        out.push_str(&metadata.join("\n"));
    }
    out
}

/// Table cells cannot contain raw pipes or newlines.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Management dashboard: a table of every prompt followed by counts.
pub fn dashboard_view(records: &[Record]) -> String {
    if records.is_empty() {
        return NO_RESULTS.to_string();
    }

    let groups = group_by_category(records);
    let mut out = String::from("# Prompt Management Dashboard\n\n");
    out.push_str("This view shows all prompts from the D1 database. ");
    out.push_str("You can use the slash commands to manage them:\n\n");
    out.push_str("- `/prompts list` - List all prompts\n");
    out.push_str("- `/prompts view <name>` - View a specific prompt\n");
    out.push_str("- `/prompts edit <name>` - Edit a prompt\n");
    out.push_str("- `/prompts create <name>` - Create a new prompt\n");
    out.push_str("- `/prompts delete <name>` - Delete a prompt\n\n");
    out.push_str("---\n\n");

    out.push_str("## All Prompts\n\n");
    out.push_str("| Category | Name | Description | Actions |\n");
    out.push_str("|----------|------|-------------|---------|\n");
    for (category, group) in &groups {
        for record in group {
            let name = field_or(record, "name", "Unnamed");
            let description = field_text(record, "description").unwrap_or_default();
            let description = if description.is_empty() {
                NO_DESCRIPTION.to_string()
            } else {
                truncate_chars(&description, DASHBOARD_DESCRIPTION_WIDTH)
            };
            let _ = writeln!(
                out,
                "| {} | {} | {} | [View](/prompts view {name}) · [Edit](/prompts edit {name}) |",
                table_cell(category),
                table_cell(&name),
                table_cell(&description),
                name = table_cell(&name),
            );
        }
    }

    out.push_str("\n---\n\n");
    out.push_str("## Quick Stats\n\n");
    let _ = writeln!(out, "- Total prompts: {}", records.len());
    let _ = writeln!(out, "- Categories: {}", groups.len());
    for (category, group) in &groups {
        let _ = writeln!(out, "  - {}: {} prompts", category, group.len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: JsonValue) -> Record {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_empty_input_sentinel() {
        assert_eq!(list_view(&[]), NO_RESULTS);
        assert_eq!(detail_view(&[]), NO_RESULTS);
        assert_eq!(dashboard_view(&[]), NO_RESULTS);
    }

    #[test]
    fn test_list_view_groups_and_sorts() {
        let records = vec![
            rec(json!({"name": "zeta", "category": "travel", "description": "Z"})),
            rec(json!({"name": "alpha", "category": "travel"})),
            rec(json!({"name": "sys", "category": "system", "description": "S"})),
            rec(json!({"name": "loose"})),
        ];
        let out = list_view(&records);

        let system = out.find("## system").unwrap();
        let travel = out.find("## travel").unwrap();
        let uncategorized = out.find("## Uncategorized").unwrap();
        assert!(uncategorized < system && system < travel);

        let alpha = out.find("- **alpha**: No description").unwrap();
        let zeta = out.find("- **zeta**: Z").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_detail_view_fields() {
        let record = rec(json!({
            "name": "travel_assistant_system",
            "category": "travel",
            "description": "Main prompt",
            "tags": ["travel", "system"],
            "content": "You are a travel assistant.",
            "author": "ops",
            "updated_at": "2024-05-01",
        }));
        let out = prompt_detail(&record);

        assert!(out.starts_with("# travel_assistant_system\n\n"));
        assert!(out.contains("**Tags:** travel, system\n"));
        assert!(out.contains("```\nYou are a travel assistant.\n```"));
        let updated = out.find("updated_at: 2024-05-01").unwrap();
        let author = out.find("author: ops").unwrap();
        assert!(updated < author);
        assert!(!out.contains("created_at"));
    }

    #[test]
    fn test_detail_view_defaults_and_prompt_fallback() {
        let out = prompt_detail(&rec(json!({"prompt": "fallback body"})));
        assert!(out.starts_with("# Unnamed Prompt"));
        assert!(out.contains("**Category:** Uncategorized"));
        assert!(out.contains("fallback body"));
        assert!(!out.contains("## Metadata"));
        assert!(!out.contains("**Tags:**"));

        let out = prompt_detail(&rec(json!({"name": "empty"})));
        assert!(out.contains("```\nNo content\n```"));
    }

    #[test]
    fn test_tags_from_strings() {
        let out = prompt_detail(&rec(json!({"tags": "[\"a\", \"b\"]"})));
        assert!(out.contains("**Tags:** a, b\n"));
        let out = prompt_detail(&rec(json!({"tags": "x,y , z"})));
        assert!(out.contains("**Tags:** x, y, z\n"));
    }

    #[test]
    fn test_dashboard_truncation() {
        let long = "a".repeat(80);
        let short = "b".repeat(40);
        let records = vec![
            rec(json!({"name": "long", "description": long})),
            rec(json!({"name": "short", "description": short})),
        ];
        let out = dashboard_view(&records);

        assert!(out.contains(&format!("| {}... |", "a".repeat(50))));
        assert!(!out.contains(&"a".repeat(51)));
        assert!(out.contains(&format!("| {} |", short)));
        assert!(!out.contains(&format!("{}...", short)));
    }

    #[test]
    fn test_dashboard_counts() {
        let records = vec![
            rec(json!({"name": "a", "category": "travel"})),
            rec(json!({"name": "b", "category": "travel"})),
            rec(json!({"name": "c", "category": "system"})),
            rec(json!({"name": "d"})),
        ];
        let out = dashboard_view(&records);
        assert!(out.contains("- Total prompts: 4\n"));
        assert!(out.contains("- Categories: 3\n"));
        assert!(out.contains("  - travel: 2 prompts\n"));
        assert!(out.contains("  - Uncategorized: 1 prompts\n"));
        assert!(out.contains("[View](/prompts view a)"));
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "é".repeat(60);
        let cut = truncate_chars(&text, 50);
        assert_eq!(cut.chars().count(), 53);
    }
}
