//! Slash commands: parsing, dispatch and formatting of deferred results.
//!
//! A command either answers directly or returns a [`Directive`] naming an
//! upstream tool call. The dispatcher records the directive's [`FormatKind`]
//! in the [`PendingResultTracker`] under the raw input text, and the host
//! passes the tool's raw result back through [`CommandDispatcher::resolve`].

pub mod directive;
pub mod dispatcher;
mod handlers;
pub mod pending;
pub mod registry;
pub mod results;

pub use directive::{CommandOutput, Directive, FormatKind, PromptsView, Reply, TravelView};
pub use dispatcher::{is_command, parse, CommandDispatcher, ParsedCommand, COMMAND_PREFIX};
pub use pending::PendingResultTracker;
pub use registry::{CommandContext, CommandError, CommandRegistry, Handler, HandlerResult, Invocation};
pub use results::{format_result, FormatError};
