//! Child-process transport: newline-delimited JSON-RPC over the child's stdio.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::{same_id, Transport};
use crate::error::{BridgeError, Result};
use crate::jsonrpc::{is_response, JsonRpcRequest, JsonRpcResponse};

/// How long a child gets to exit on its own after stdin is closed.
const EXIT_GRACE: Duration = Duration::from_secs(2);

struct Pipes {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

/// Transport to an upstream server running as a child process.
pub struct StdioTransport {
    server: String,
    pipes: Mutex<Pipes>,
    child: Mutex<Child>,
}

impl StdioTransport {
    /// Spawn `command` and take over its stdin/stdout. Stderr lines are logged.
    pub fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::upstream(server, format!("failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Internal("child stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Internal("child stdout not captured".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let name = server.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(server = %name, line = %line, "upstream stderr");
                }
            });
        }

        tracing::debug!(server, command, "spawned upstream process");
        Ok(Self {
            server: server.to_string(),
            pipes: Mutex::new(Pipes {
                stdin,
                lines: BufReader::new(stdout).lines(),
            }),
            child: Mutex::new(child),
        })
    }

    async fn write_message(&self, pipes: &mut Pipes, message: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        pipes.stdin.write_all(line.as_bytes()).await?;
        pipes.stdin.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let sent_id = request
            .id
            .clone()
            .ok_or_else(|| BridgeError::Internal("request without id".to_string()))?;

        // Holding the pipes for the whole exchange keeps responses in order.
        let mut pipes = self.pipes.lock().await;
        self.write_message(&mut pipes, &request).await?;

        loop {
            let line = match pipes.lines.next_line().await? {
                Some(line) => line,
                None => {
                    return Err(BridgeError::upstream(&self.server, "process closed its stdout"));
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: JsonValue = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(_) => {
                    tracing::debug!(server = %self.server, line = %line, "upstream stdout (non-json)");
                    continue;
                }
            };

            if !is_response(&value) {
                tracing::debug!(
                    server = %self.server,
                    method = %value.get("method").and_then(|m| m.as_str()).unwrap_or(""),
                    "ignoring server-initiated message"
                );
                continue;
            }

            let matches = value.get("id").map(|id| same_id(&sent_id, id)).unwrap_or(false);
            if !matches {
                tracing::debug!(server = %self.server, "discarding response for an earlier request");
                continue;
            }

            return Ok(serde_json::from_value(value)?);
        }
    }

    async fn notify(&self, notification: JsonRpcRequest) -> Result<()> {
        let mut pipes = self.pipes.lock().await;
        self.write_message(&mut pipes, &notification).await
    }

    async fn close(&self) -> Result<()> {
        {
            let mut pipes = self.pipes.lock().await;
            let _ = pipes.stdin.shutdown().await;
        }

        let mut child = self.child.lock().await;
        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(status) => {
                tracing::debug!(server = %self.server, status = ?status, "upstream process exited");
            }
            Err(_) => {
                tracing::debug!(server = %self.server, "killing upstream process");
                child.kill().await?;
            }
        }
        Ok(())
    }
}
