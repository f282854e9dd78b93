//! The `slash_command` tool: runs a slash command and any upstream call it defers to.

use serde_json::{Map, Value as JsonValue};

use crate::commands::{CommandDispatcher, CommandOutput};
use crate::convert::get_string_arg;
use crate::error::Result;
use crate::schema;
use crate::session::BridgeSession;
use crate::tools::ToolDef;

/// Name of the tool as listed to the client.
pub const TOOL_NAME: &str = "slash_command";

/// Get tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![ToolDef::new(
        TOOL_NAME,
        "Run a slash command such as /help, /prompts list or /travel. \
         Commands that need data call the matching upstream tool and return its formatted result.",
        schema!(object {
            required: { "input": string }
        }),
    )]
}

/// Executes slash commands on behalf of the client.
pub struct SlashCommandTool {
    dispatcher: CommandDispatcher,
}

impl SlashCommandTool {
    pub fn new(dispatcher: CommandDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Run the command in `args.input`.
    ///
    /// A deferred command runs its directive on the named upstream server and
    /// the raw result is formatted through the dispatcher's tracker. When the
    /// upstream call fails the pending entry is dropped and the error returned.
    pub async fn call(&self, session: &BridgeSession, args: Map<String, JsonValue>) -> Result<String> {
        let input = get_string_arg(&args, "input")?;
        let context = session.command_context();

        match self.dispatcher.execute(&input, &context) {
            CommandOutput::Direct(text) => Ok(text),
            CommandOutput::Defer { directive, pending_key } => {
                let raw = session
                    .invoke(&directive.server, &directive.operation, directive.arguments.clone())
                    .await;
                match raw {
                    Ok(raw) => Ok(self.dispatcher.resolve(&pending_key, raw)),
                    Err(err) => {
                        self.dispatcher.tracker().take(&pending_key);
                        Err(err)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_requires_input() {
        let defs = tools();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "slash_command");
        assert_eq!(defs[0].input_schema["required"], serde_json::json!(["input"]));
        assert_eq!(defs[0].input_schema["properties"]["input"]["type"], "string");
    }
}
