//! Built-in slash commands.

mod prompts;
mod travel;

use super::directive::{Directive, FormatKind, PromptsView, Reply};
use super::registry::{CommandError, CommandRegistry, HandlerResult, Invocation};

/// Register every built-in command, in help order.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(
        "travel",
        "Initialize the travel assistant",
        travel::handle,
        "/travel or /t",
        &["t", "init-travel", "travel-init", "start"],
    );
    registry.register(
        "go",
        "Quick start travel assistant (alias for /travel)",
        travel::handle,
        "/go",
        &["g", "init"],
    );
    registry.register(
        "prompts",
        "View and manage D1 database prompts",
        prompts::handle,
        "/prompts [list|view|dashboard|search|category|edit|create|delete|update]",
        &["p", "prompt"],
    );
    registry.register(
        "servers",
        "List available MCP servers",
        handle_servers,
        "/servers",
        &["s", "list-servers"],
    );
    registry.register(
        "connect",
        "Connect to an MCP server",
        handle_connect,
        "/connect <server-name>",
        &["c"],
    );
    registry.register(
        "tools",
        "List available tools",
        handle_tools,
        "/tools [server-name]",
        &["tool", "list-tools"],
    );
    registry.register(
        "help",
        "Show available slash commands",
        handle_help,
        "/help [command]",
        &["h", "?"],
    );
    registry.register(
        "create-prompt",
        "Quick create a new prompt",
        handle_create_prompt,
        "/create-prompt <name> [<description> <category> <content> [tags]]",
        &["cp", "new-prompt"],
    );
}

/// Quote `value` as an SQL string literal.
pub(crate) fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `line` with its first `count` whitespace-delimited tokens removed.
pub(crate) fn skip_tokens(line: &str, count: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

/// Split on whitespace, keeping single- or double-quoted runs together.
pub(crate) fn split_quoted(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(CommandError::InvalidArgument {
            name: "input".to_string(),
            reason: format!("unterminated {} quote", q),
        });
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Comma-separated tags as a JSON array string.
pub(crate) fn tags_json(tags: &str) -> Result<String, CommandError> {
    let list: Vec<&str> = tags
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    Ok(serde_json::to_string(&list)?)
}

fn handle_servers(invocation: &Invocation<'_>) -> HandlerResult {
    let context = invocation.context;
    if context.servers.is_empty() {
        return Ok("Please list the available MCP servers.".into());
    }

    let mut out = String::from("**Configured MCP servers:**\n\n");
    for server in &context.servers {
        let marker = if context.active_server.as_deref() == Some(server.as_str()) {
            " (active)"
        } else {
            ""
        };
        out.push_str(&format!("• {}{}\n", server, marker));
    }
    Ok(out.into())
}

fn handle_connect(invocation: &Invocation<'_>) -> HandlerResult {
    let Some(name) = invocation.subcommand else {
        return Ok("Please specify a server name. Usage: /connect <server-name>".into());
    };

    let servers = &invocation.context.servers;
    if servers.is_empty() {
        return Ok(format!("Please connect to the MCP server named '{}'.", name).into());
    }
    if servers.iter().any(|s| s == name) {
        Ok(format!(
            "Server '{}' is configured. It is connected on first use by a command that targets it.",
            name
        )
        .into())
    } else {
        Ok(format!(
            "Unknown server '{}'. Configured servers: {}",
            name,
            servers.join(", ")
        )
        .into())
    }
}

fn handle_tools(invocation: &Invocation<'_>) -> HandlerResult {
    let servers = &invocation.context.servers;
    match invocation.subcommand {
        Some(name) if servers.is_empty() => {
            Ok(format!("Please search for tools available on the '{}' server.", name).into())
        }
        None if servers.is_empty() => Ok("Please search for all available MCP tools.".into()),
        Some(name) if !servers.iter().any(|s| s == name) => Ok(format!(
            "Unknown server '{}'. Configured servers: {}",
            name,
            servers.join(", ")
        )
        .into()),
        Some(name) => Ok(format!(
            "Tools from '{}' are listed by the client's tools/list request when it is the bridged server.",
            name
        )
        .into()),
        None => Ok(format!(
            "Tools are listed by the client's tools/list request. Configured servers: {}",
            servers.join(", ")
        )
        .into()),
    }
}

fn handle_help(invocation: &Invocation<'_>) -> HandlerResult {
    let registry = invocation.registry;

    if let Some(name) = invocation.subcommand {
        return Ok(match registry.lookup(name) {
            Some(cmd) => format!("**/{}** - {}\nUsage: {}", cmd.name, cmd.description, cmd.usage),
            None => format!("Unknown command: {}", name),
        }
        .into());
    }

    let mut out = String::from("**Available slash commands:**\n\n");
    for cmd in registry.list_unique() {
        out.push_str(&format!("• **/{}** - {}", cmd.name, cmd.description));
        if !cmd.aliases.is_empty() {
            let aliases: Vec<String> = cmd.aliases.iter().map(|a| format!("/{}", a)).collect();
            out.push_str(&format!(" (aliases: {})", aliases.join(", ")));
        }
        out.push_str(&format!("\n  Usage: {}\n\n", cmd.usage));
    }
    Ok(out.into())
}

const CREATE_PROMPT_USAGE: &str = "Usage: /create-prompt <name> <description> <category> <content> [tags]\n\
Example: /create-prompt travel-assistant 'Helpful travel planner' travel 'You are a travel assistant...' 'travel,planning'";

fn handle_create_prompt(invocation: &Invocation<'_>) -> HandlerResult {
    let tokens = split_quoted(invocation.rest)?;

    match tokens.as_slice() {
        [] => Ok(format!("Please specify a prompt name. {}", CREATE_PROMPT_USAGE).into()),
        [name] => Ok(guided_create(name).into()),
        [name, description, category, content, rest @ ..] => {
            let tags = tags_json(rest.first().map(String::as_str).unwrap_or(""))?;
            let sql = format!(
                "INSERT INTO prompts (name, description, category, content, tags, created_at, updated_at) \
                 VALUES ({}, {}, {}, {}, {}, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
                sql_literal(name),
                sql_literal(description),
                sql_literal(category),
                sql_literal(content),
                sql_literal(&tags),
            );
            Ok(Reply::Query(Directive::execute(
                sql,
                FormatKind::Prompts(PromptsView::Create),
            )))
        }
        _ => Ok(CREATE_PROMPT_USAGE.into()),
    }
}

fn guided_create(name: &str) -> String {
    format!(
        "To create the prompt '{name}', please provide the following information:\n\n\
         **Name:** {name}\n\
         **Description:** (Brief description of what this prompt does)\n\
         **Category:** (e.g., travel, system, utility)\n\
         **Content:** (The actual prompt text)\n\
         **Tags:** (Comma-separated tags, optional)\n\n\
         You can create it in one step with:\n\
         `/create-prompt {name} '<description>' <category> '<content>' '<tags>'`\n\n\
         Or create it with `/prompts create {name}` and then use \
         `/prompts update {name} <field> <value>` to set each field."
    )
}
