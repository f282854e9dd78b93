//! MCP stdio bridge to remote MCP servers.
//!
//! Run with `mcp-use-bridge --config servers.json --server <name>`.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::filter::{Directive, EnvFilter};

use mcp_use_bridge::commands::{CommandDispatcher, CommandRegistry, PendingResultTracker};
use mcp_use_bridge::{BridgeConfig, BridgeServer, BridgeSession, ToolRegistry};

/// MCP bridge for remote MCP servers.
///
/// Serves the tools of one configured upstream server to a desktop client.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mcp-use-bridge")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file with an "mcpServers" table.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Name of the configured server to bridge.
    #[arg(long, value_name = "NAME")]
    server: String,

    /// Enable debug logging to stderr.
    #[arg(long)]
    debug: bool,

    /// Also serve the local `slash_command` tool.
    #[arg(long)]
    slash_commands: bool,

    /// Seconds an unanswered slash command stays pending.
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pending_ttl: u64,

    /// Maximum number of pending slash commands.
    #[arg(long, value_name = "N", default_value_t = 256)]
    max_pending: usize,

    /// Seconds to wait for an upstream response.
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    request_timeout: u64,
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    match format!("mcp_use_bridge={}", level).parse::<Directive>() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Warning: invalid log directive: {}", e),
    }

    // stdout carries the protocol; logs must go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let config = match BridgeConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let timeout = Duration::from_secs(args.request_timeout);
    let session = match BridgeSession::connect(config, &args.server, timeout).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(server = %args.server, error = %e, "failed to initialize bridge");
            std::process::exit(1);
        }
    };
    tracing::info!(server = %args.server, "bridge initialized");

    let registry = if args.slash_commands {
        let tracker = PendingResultTracker::new(Duration::from_secs(args.pending_ttl), args.max_pending);
        let dispatcher = CommandDispatcher::new(Arc::new(CommandRegistry::with_builtins()), Arc::new(tracker));
        ToolRegistry::with_slash_commands(dispatcher)
    } else {
        ToolRegistry::new()
    };

    let mut server = BridgeServer::new(session, registry);
    let outcome = server.run().await;
    server.session().close_all().await;

    if let Err(e) = outcome {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
