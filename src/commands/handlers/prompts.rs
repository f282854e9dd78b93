//! `/prompts`: browse and edit the prompt table.

use super::{skip_tokens, sql_literal, tags_json};
use crate::commands::directive::{Directive, FormatKind, PromptsView};
use crate::commands::registry::{HandlerResult, Invocation};

const UPDATABLE_FIELDS: &[&str] = &["description", "content", "category", "tags"];

fn kind(view: PromptsView) -> FormatKind {
    FormatKind::Prompts(view)
}

fn like(term: &str) -> String {
    sql_literal(&format!("%{}%", term))
}

pub(super) fn handle(invocation: &Invocation<'_>) -> HandlerResult {
    let args = invocation.args;
    let joined = args.join(" ");

    let directive = match invocation.subcommand {
        None | Some("list") => Directive::query(
            "SELECT name, description, category, tags, updated_at FROM prompts ORDER BY category, name",
            kind(PromptsView::List),
        ),
        Some("view") => {
            if args.is_empty() {
                return Ok("Please specify a prompt name. Usage: /prompts view <prompt_name>".into());
            }
            Directive::query(
                format!("SELECT * FROM prompts WHERE name = {} LIMIT 1", sql_literal(&joined)),
                kind(PromptsView::View),
            )
        }
        Some("dashboard") => Directive::query(
            "SELECT name, description, category, tags, created_at, updated_at FROM prompts ORDER BY category, name",
            kind(PromptsView::Dashboard),
        ),
        Some("search") => {
            if args.is_empty() {
                return Ok("Please specify search terms. Usage: /prompts search <keywords>".into());
            }
            let term = like(&joined);
            Directive::query(
                format!(
                    "SELECT name, description, category FROM prompts \
                     WHERE name LIKE {term} OR description LIKE {term} OR content LIKE {term} ORDER BY name"
                ),
                kind(PromptsView::Search),
            )
        }
        Some("category") if args.is_empty() => Directive::query(
            "SELECT DISTINCT category, COUNT(*) as count FROM prompts GROUP BY category ORDER BY category",
            kind(PromptsView::Category),
        ),
        Some("category") => Directive::query(
            format!(
                "SELECT name, description FROM prompts WHERE category = {} ORDER BY name",
                sql_literal(&joined)
            ),
            kind(PromptsView::Category),
        ),
        Some("edit") => {
            if args.is_empty() {
                return Ok("Please specify a prompt name. Usage: /prompts edit <prompt_name>".into());
            }
            return Ok(edit_instructions(&joined).into());
        }
        Some("create") => {
            if args.is_empty() {
                return Ok("Please specify a prompt name. Usage: /prompts create <prompt_name>".into());
            }
            return Ok(create_instructions(&joined).into());
        }
        Some("update") => return update(args, invocation.rest),
        Some("delete") => {
            if args.is_empty() {
                return Ok("Please specify a prompt name. Usage: /prompts delete <prompt_name>".into());
            }
            Directive::execute(
                format!("DELETE FROM prompts WHERE name = {}", sql_literal(&joined)),
                kind(PromptsView::Delete),
            )
        }
        Some(other) => {
            return Ok(format!(
                "Unknown subcommand: {}. Available: list, view, dashboard, search, category, edit, create, update, delete",
                other
            )
            .into())
        }
    };

    Ok(directive.into())
}

fn update(args: &[String], rest: &str) -> HandlerResult {
    let [name, field, ..] = args else {
        return Ok("Please specify prompt name and field to update. \
                   Usage: /prompts update <prompt_name> <field> <new_value>"
            .into());
    };

    if !UPDATABLE_FIELDS.contains(&field.as_str()) {
        return Ok(format!(
            "Invalid field '{}'. Valid fields: {}",
            field,
            UPDATABLE_FIELDS.join(", ")
        )
        .into());
    }

    // `rest` still starts with "update <name> <field>".
    let value = skip_tokens(rest, 3).to_string();
    if value.is_empty() {
        return Ok(format!("Please provide a new value for {}.", field).into());
    }

    let stored = if field == "tags" { tags_json(&value)? } else { value };

    // `field` is one of UPDATABLE_FIELDS, so it is safe to splice in.
    let sql = format!(
        "UPDATE prompts SET {} = {}, updated_at = CURRENT_TIMESTAMP WHERE name = {}",
        field,
        sql_literal(&stored),
        sql_literal(name)
    );
    Ok(Directive::execute(sql, kind(PromptsView::Update)).into())
}

fn edit_instructions(name: &str) -> String {
    format!(
        "To edit the prompt '{name}', follow these steps:\n\n\
         1. First view the prompt: `/prompts view {name}`\n\
         2. Then update specific fields: `/prompts update {name} <field> <new_value>`\n\n\
         Available fields: name, description, content, category, tags\n\n\
         Example: `/prompts update {name} description New description here`"
    )
}

fn create_instructions(name: &str) -> String {
    format!(
        "Creating new prompt '{name}'.\n\n\
         Please provide the following details:\n\
         1. **Description**: Brief description of the prompt\n\
         2. **Category**: Category for organization (e.g., 'travel', 'general', 'technical')\n\
         3. **Content**: The actual prompt content\n\
         4. **Tags** (optional): Comma-separated tags\n\n\
         Example format:\n\
         ```\n\
         Description: A helpful travel planning assistant\n\
         Category: travel\n\
         Content: You are a knowledgeable travel assistant...\n\
         Tags: travel, planning, assistant\n\
         ```"
    )
}
