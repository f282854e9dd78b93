//! Slash command registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::directive::Reply;
use super::handlers;

/// Information the host shares with command handlers.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Upstream servers the host knows about.
    pub servers: Vec<String>,
    /// The server whose tools the host is bridging.
    pub active_server: Option<String>,
}

/// A handler failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::Failed(err.to_string())
    }
}

/// One handler call.
pub struct Invocation<'a> {
    pub context: &'a CommandContext,
    pub registry: &'a CommandRegistry,
    pub subcommand: Option<&'a str>,
    pub args: &'a [String],
    /// Raw text after the command token, for handlers that need exact spacing.
    pub rest: &'a str,
}

/// Result of a handler.
pub type HandlerResult = Result<Reply, CommandError>;

/// Command implementation.
pub type Handler = fn(&Invocation<'_>) -> HandlerResult;

/// A registered command.
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub usage: String,
    pub aliases: Vec<String>,
    handler: Handler,
}

impl CommandDescriptor {
    /// Run the handler.
    pub fn invoke(&self, invocation: &Invocation<'_>) -> HandlerResult {
        (self.handler)(invocation)
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

/// Lookup table from command name or alias to its descriptor.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    table: HashMap<String, Arc<CommandDescriptor>>,
    order: Vec<Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        handlers::register_builtins(&mut registry);
        registry
    }

    /// Register a command under its name and every alias.
    ///
    /// Registering a name again replaces the earlier command.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        handler: Handler,
        usage: &str,
        aliases: &[&str],
    ) {
        let descriptor = Arc::new(CommandDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            usage: usage.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            handler,
        });

        match self.order.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = descriptor.clone(),
            None => self.order.push(descriptor.clone()),
        }

        self.table.insert(name.to_string(), descriptor.clone());
        for alias in aliases {
            self.table.insert(alias.to_string(), descriptor.clone());
        }
    }

    /// Exact-match lookup of a name or alias.
    pub fn lookup(&self, name: &str) -> Option<&CommandDescriptor> {
        self.table.get(name).map(|d| d.as_ref())
    }

    /// One descriptor per canonical command, in registration order.
    pub fn list_unique(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.order.iter().map(|d| d.as_ref())
    }

    /// Number of canonical commands.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
