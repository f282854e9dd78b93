//! Parsing and execution of slash commands.

use std::sync::Arc;

use super::directive::{CommandOutput, Reply};
use super::pending::PendingResultTracker;
use super::registry::{CommandContext, CommandRegistry, Invocation};
use crate::viewer::RawResult;

/// Character that starts every command.
pub const COMMAND_PREFIX: char = '/';

/// A command line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased command name. Empty for a lone prefix.
    pub command: String,
    pub subcommand: Option<String>,
    pub args: Vec<String>,
    /// Everything after the command token, original spacing kept.
    pub rest: String,
}

/// Split `input` into command, subcommand and arguments.
///
/// Returns `None` exactly when [`is_command`] is false.
pub fn parse(input: &str) -> Option<ParsedCommand> {
    let body = input.trim().strip_prefix(COMMAND_PREFIX)?.trim_start();
    let command_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let (command, rest) = body.split_at(command_end);
    let rest = rest.trim_start();
    let mut tokens = rest.split_whitespace();

    Some(ParsedCommand {
        command: command.to_lowercase(),
        subcommand: tokens.next().map(str::to_string),
        args: tokens.map(str::to_string).collect(),
        rest: rest.to_string(),
    })
}

/// Whether `input` is a slash command.
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with(COMMAND_PREFIX)
}

/// Runs commands against a registry and records which results need formatting.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    tracker: Arc<PendingResultTracker>,
}

impl CommandDispatcher {
    /// Create a dispatcher over a shared registry and tracker.
    pub fn new(registry: Arc<CommandRegistry>, tracker: Arc<PendingResultTracker>) -> Self {
        Self { registry, tracker }
    }

    /// Dispatcher with the built-in commands and a default tracker.
    pub fn with_builtins() -> Self {
        Self::new(
            Arc::new(CommandRegistry::with_builtins()),
            Arc::new(PendingResultTracker::default()),
        )
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &PendingResultTracker {
        &self.tracker
    }

    /// Run one input line. Never fails: every problem is reported as text.
    pub fn execute(&self, input: &str, context: &CommandContext) -> CommandOutput {
        let parsed = match parse(input) {
            Some(parsed) => parsed,
            None => {
                return CommandOutput::Direct(format!(
                    "Not a slash command: '{}'. Commands start with '{}'. Use /help for available commands.",
                    input.trim(),
                    COMMAND_PREFIX
                ))
            }
        };

        let command = match self.registry.lookup(&parsed.command) {
            Some(command) => command,
            None => {
                tracing::debug!(command = %parsed.command, "unknown slash command");
                return CommandOutput::Direct(format!(
                    "Unknown command: /{}. Use /help for available commands.",
                    parsed.command
                ));
            }
        };

        let invocation = Invocation {
            context,
            registry: &self.registry,
            subcommand: parsed.subcommand.as_deref(),
            args: &parsed.args,
            rest: &parsed.rest,
        };

        match command.invoke(&invocation) {
            Ok(Reply::Text(text)) => CommandOutput::Direct(text),
            Ok(Reply::Query(directive)) => {
                tracing::info!(
                    command = %command.name,
                    server = %directive.server,
                    operation = %directive.operation,
                    kind = %directive.format,
                    "command deferred to upstream tool"
                );
                self.tracker.mark_pending(input, directive.format);
                CommandOutput::Defer {
                    directive,
                    pending_key: input.to_string(),
                }
            }
            Err(err) => {
                tracing::error!(command = %command.name, error = %err, "error executing command");
                CommandOutput::Direct(format!("Error executing command: {}", err))
            }
        }
    }

    /// Format the raw result of a deferred command. Pass-through when nothing is pending.
    pub fn resolve(&self, pending_key: &str, raw: impl Into<RawResult>) -> String {
        self.tracker.resolve(pending_key, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::directive::{FormatKind, PromptsView};

    fn deferred_sql(out: &CommandOutput) -> String {
        match out {
            CommandOutput::Defer { directive, .. } => directive.sql().unwrap_or_default().to_string(),
            CommandOutput::Direct(text) => panic!("expected directive, got {}", text),
        }
    }

    #[test]
    fn test_parse_splits_tokens() {
        let parsed = parse("  /Prompts view travel  assistant ").unwrap();
        assert_eq!(parsed.command, "prompts");
        assert_eq!(parsed.subcommand.as_deref(), Some("view"));
        assert_eq!(parsed.args, vec!["travel", "assistant"]);
        assert_eq!(parsed.rest, "view travel  assistant");

        let parsed = parse("/ help").unwrap();
        assert_eq!(parsed.command, "help");
        assert_eq!(parsed.rest, "");
    }

    #[test]
    fn test_parse_and_is_command_agree() {
        for input in ["", "   ", "hello", "what /is this", "x/", "/", " /", "/help", "\t/t check", "//x"] {
            assert_eq!(parse(input).is_some(), is_command(input), "input {:?}", input);
        }
        assert!(parse("hello").is_none());
        assert_eq!(parse("/").unwrap().command, "");
    }

    #[test]
    fn test_unknown_command_names_token() {
        let dispatcher = CommandDispatcher::with_builtins();
        let out = dispatcher.execute("/frobnicate now", &CommandContext::default());
        assert_eq!(
            out,
            CommandOutput::Direct("Unknown command: /frobnicate. Use /help for available commands.".to_string())
        );
    }

    #[test]
    fn test_non_command_is_reported() {
        let dispatcher = CommandDispatcher::with_builtins();
        let out = dispatcher.execute("plan my trip", &CommandContext::default());
        assert!(out.as_text().unwrap().starts_with("Not a slash command"));
    }

    #[test]
    fn test_alias_directive_records_pending_entry() {
        let dispatcher = CommandDispatcher::with_builtins();
        let out = dispatcher.execute("/p dashboard", &CommandContext::default());

        match out {
            CommandOutput::Defer { directive, pending_key } => {
                assert_eq!(pending_key, "/p dashboard");
                assert_eq!(directive.format, FormatKind::Prompts(PromptsView::Dashboard));
            }
            other => panic!("expected deferral, got {:?}", other),
        }
        assert!(dispatcher.tracker().is_pending("/p dashboard"));
    }

    #[test]
    fn test_direct_reply_records_nothing() {
        let dispatcher = CommandDispatcher::with_builtins();
        let out = dispatcher.execute("/travel setup", &CommandContext::default());
        assert!(out.as_text().unwrap().contains("Setup Wizard"));
        assert!(dispatcher.tracker().is_empty());
    }

    #[test]
    fn test_create_prompt_keeps_quoted_whitespace() {
        let dispatcher = CommandDispatcher::with_builtins();
        let out = dispatcher.execute(
            "/create-prompt planner \"Plans  trips\" travel \"Line one.\nLine two.\"",
            &CommandContext::default(),
        );

        let sql = deferred_sql(&out);
        assert!(sql.contains("'planner', 'Plans  trips', 'travel', 'Line one.\nLine two.', '[]'"), "{}", sql);
    }

    #[test]
    fn test_update_keeps_value_spacing() {
        let dispatcher = CommandDispatcher::with_builtins();
        let out = dispatcher.execute(
            "/prompts update planner content First line.\n\n  Indented  text.",
            &CommandContext::default(),
        );

        let sql = deferred_sql(&out);
        assert!(sql.contains("content = 'First line.\n\n  Indented  text.'"), "{}", sql);
    }

    #[test]
    fn test_handler_failure_is_caught() {
        let dispatcher = CommandDispatcher::with_builtins();
        let out = dispatcher.execute("/create-prompt name 'unterminated", &CommandContext::default());
        assert!(out.as_text().unwrap().starts_with("Error executing command:"));
    }
}
