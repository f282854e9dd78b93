//! Integration tests for the bridge server and the slash-command pipeline.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use mcp_use_bridge::commands::{CommandContext, CommandDispatcher, CommandOutput};
use mcp_use_bridge::{
    BridgeConfig, BridgeServer, BridgeSession, JsonRpcRequest, JsonRpcResponse, ToolRegistry, Transport,
    UpstreamClient,
};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Upstream server answering from canned tool results.
struct FakeUpstream {
    tools: Vec<JsonValue>,
    results: HashMap<String, JsonValue>,
    calls: Arc<Mutex<Vec<JsonValue>>>,
}

#[async_trait]
impl Transport for FakeUpstream {
    async fn request(&self, request: JsonRpcRequest) -> mcp_use_bridge::Result<JsonRpcResponse> {
        let params = request.params.clone().unwrap_or(JsonValue::Null);
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(request.id, json!({"serverInfo": {"name": "fake"}})),
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": self.tools })),
            "tools/call" => {
                self.calls.lock().push(params.clone());
                let name = params["name"].as_str().unwrap_or_default();
                match self.results.get(name) {
                    Some(result) => JsonRpcResponse::success(request.id, result.clone()),
                    None => JsonRpcResponse::error(request.id, -32601, format!("no tool {}", name)),
                }
            }
            other => JsonRpcResponse::error(request.id, -32601, format!("unexpected {}", other)),
        };
        Ok(response)
    }

    async fn notify(&self, _notification: JsonRpcRequest) -> mcp_use_bridge::Result<()> {
        Ok(())
    }

    async fn close(&self) -> mcp_use_bridge::Result<()> {
        Ok(())
    }
}

/// Text result as an upstream tool would send it.
fn text(body: &str) -> JsonValue {
    json!({"content": [{"type": "text", "text": body}]})
}

/// Write `servers` as the `mcpServers` table of a config file and load it.
fn load_config(servers: &str) -> BridgeConfig {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(file, r#"{{"mcpServers": {}}}"#, servers).expect("Failed to write config");
    BridgeConfig::from_file(file.path()).expect("Failed to load config")
}

/// Config naming the fake servers. `prompt-server` cannot be started.
fn test_config() -> BridgeConfig {
    load_config(
        r#"{
            "d1-database": {"command": "d1-mcp"},
            "prompt-server": {"command": "/nonexistent/mcp-prompt-server"}
        }"#,
    )
}

/// Fake `d1-database` that only knows `query`.
fn fake_d1() -> FakeUpstream {
    FakeUpstream {
        tools: vec![],
        results: HashMap::from([("query".to_string(), text("ok"))]),
        calls: Arc::new(Mutex::new(Vec::new())),
    }
}

struct Harness {
    server: BridgeServer,
    d1_calls: Arc<Mutex<Vec<JsonValue>>>,
}

/// Bridge over a fake `d1-database` holding `results`, with slash commands on.
async fn harness(results: Vec<(&str, JsonValue)>) -> Harness {
    let d1_calls = Arc::new(Mutex::new(Vec::new()));
    let d1 = FakeUpstream {
        tools: vec![
            json!({"name": "query", "description": "Run SQL", "inputSchema": {"type": "object", "properties": {"query": {"type": "string"}}}}),
            json!({"name": "execute"}),
        ],
        results: results.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        calls: d1_calls.clone(),
    };

    let session = BridgeSession::new(test_config(), "d1-database", TIMEOUT).expect("Failed to create session");
    session
        .attach(UpstreamClient::new("d1-database", Box::new(d1), TIMEOUT))
        .await;

    let server = BridgeServer::new(session, ToolRegistry::with_slash_commands(CommandDispatcher::with_builtins()));
    Harness { server, d1_calls }
}

/// Send one request and return the full response as JSON.
async fn rpc(server: &mut BridgeServer, method: &str, params: JsonValue) -> JsonValue {
    let request: JsonRpcRequest =
        serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}))
            .expect("Failed to build request");
    let response = server.handle_request(request).await.expect("Expected a response");
    serde_json::to_value(response).expect("Failed to serialize response")
}

/// Call a tool and return (text, isError).
async fn call(server: &mut BridgeServer, name: &str, arguments: JsonValue) -> (String, bool) {
    let response = rpc(server, "tools/call", json!({"name": name, "arguments": arguments})).await;
    let result = &response["result"];
    (
        result["content"][0]["text"].as_str().unwrap_or_default().to_string(),
        result["isError"].as_bool().unwrap_or(false),
    )
}

// =============================================================================
// Protocol
// =============================================================================

#[tokio::test]
async fn test_initialize_names_bridged_server() {
    let mut h = harness(vec![]).await;
    let response = rpc(&mut h.server, "initialize", json!({"clientInfo": {"name": "desktop"}})).await;

    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "mcp-use-d1-database");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert!(h.server.is_initialized());
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let mut h = harness(vec![]).await;
    let note: JsonRpcRequest =
        serde_json::from_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).unwrap();
    assert!(h.server.handle_request(note).await.is_none());
}

#[tokio::test]
async fn test_unknown_method_and_bad_version() {
    let mut h = harness(vec![]).await;
    let response = rpc(&mut h.server, "resources/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);

    let request: JsonRpcRequest =
        serde_json::from_value(json!({"jsonrpc": "1.0", "id": 2, "method": "ping"})).unwrap();
    let response = h.server.handle_request(request).await.unwrap();
    assert_eq!(response.error.unwrap().code, -32600);
}

#[tokio::test]
async fn test_serve_over_stream() {
    let mut h = harness(vec![]).await;
    let input = concat!(
        r#"{"jsonrpc": "2.0", "id": 7, "method": "ping"}"#,
        "\n\n",
        r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
        "\n",
        "not json\n",
    );
    let mut output = Vec::new();
    h.server
        .serve(tokio::io::BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();

    let lines: Vec<JsonValue> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 7);
    assert_eq!(lines[1]["error"]["code"], -32700);
}

// =============================================================================
// Forwarded Tools
// =============================================================================

#[tokio::test]
async fn test_tools_list_merges_local_tool() {
    let mut h = harness(vec![]).await;
    let response = rpc(&mut h.server, "tools/list", json!({})).await;
    let tools = response["result"]["tools"].as_array().unwrap();

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["query", "execute", "slash_command"]);
    assert_eq!(tools[1]["description"], "Tool: execute");
    assert_eq!(tools[1]["inputSchema"], json!({"type": "object"}));
    assert_eq!(tools[0]["inputSchema"]["properties"]["query"]["type"], "string");
}

#[tokio::test]
async fn test_tools_call_is_forwarded() {
    let mut h = harness(vec![(
        "query",
        json!({"content": [{"type": "text", "text": "line one"}, {"type": "text", "text": "line two"}]}),
    )])
    .await;

    let (text, is_error) = call(&mut h.server, "query", json!({"query": "SELECT 1"})).await;
    assert_eq!(text, "line one\nline two");
    assert!(!is_error);
    assert_eq!(h.d1_calls.lock()[0]["arguments"]["query"], "SELECT 1");
}

#[tokio::test]
async fn test_tools_call_failure_is_error_text() {
    let mut h = harness(vec![]).await;
    let (text, is_error) = call(&mut h.server, "drop_everything", json!({})).await;
    assert!(text.starts_with("Error: "));
    assert!(text.contains("no tool drop_everything"));
    assert!(is_error);
}

// =============================================================================
// Slash Commands
// =============================================================================

#[tokio::test]
async fn test_slash_help_is_direct() {
    let mut h = harness(vec![]).await;
    let (text, is_error) = call(&mut h.server, "slash_command", json!({"input": "/help"})).await;
    assert!(text.starts_with("**Available slash commands:**"));
    assert!(!is_error);
    assert!(h.d1_calls.lock().is_empty());
}

#[tokio::test]
async fn test_slash_dashboard_formats_query_result() {
    let rows = r#"[
        {"name": "planner", "description": "Plans trips", "category": "travel", "tags": "[\"trips\"]"},
        {"name": "helper", "description": "General help", "category": "system"}
    ]"#;
    let mut h = harness(vec![("query", text(rows))]).await;

    let (out, is_error) = call(&mut h.server, "slash_command", json!({"input": "/p dashboard"})).await;
    assert!(!is_error);
    assert!(out.starts_with("# Prompt Management Dashboard"));
    assert!(out.contains("planner"));

    let calls = h.d1_calls.lock();
    assert_eq!(calls[0]["name"], "query");
    assert!(calls[0]["arguments"]["query"].as_str().unwrap().contains("created_at"));
}

#[tokio::test]
async fn test_slash_list_uses_pipe_table() {
    let table = "| name | category | description |\n|---|---|---|\n| planner | travel | Plans trips |";
    let mut h = harness(vec![("query", text(table))]).await;

    let (out, _) = call(&mut h.server, "slash_command", json!({"input": "/prompts list"})).await;
    assert!(out.starts_with("# Available Prompts"));
    assert!(out.contains("planner"));
}

#[tokio::test]
async fn test_slash_database_error_is_explained() {
    let mut h = harness(vec![("query", text("Failed to connect to database"))]).await;
    let (out, _) = call(&mut h.server, "slash_command", json!({"input": "/prompts"})).await;
    assert!(out.starts_with("❌ Database Error"));
}

#[tokio::test]
async fn test_slash_delete_reports_success() {
    let mut h = harness(vec![("execute", text(r#"{"success": true, "changes": 1}"#))]).await;
    let (out, _) = call(&mut h.server, "slash_command", json!({"input": "/prompts delete old"})).await;
    assert_eq!(out, "✅ Prompt deleted successfully.");
    assert_eq!(
        h.d1_calls.lock()[0]["arguments"]["query"],
        "DELETE FROM prompts WHERE name = 'old'"
    );
}

#[tokio::test]
async fn test_slash_lazy_connection_failure() {
    let mut h = harness(vec![]).await;
    // prompt-server's command does not exist, so connecting on first use fails.
    let (out, is_error) = call(&mut h.server, "slash_command", json!({"input": "/travel"})).await;
    assert!(is_error);
    assert!(out.starts_with("Error: "));
}

#[tokio::test]
async fn test_slow_connect_does_not_block_primary() {
    // Accepts the TCP handshake but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    let config = load_config(&format!(
        r#"{{"d1-database": {{"command": "d1-mcp"}}, "slow": {{"url": "http://{}/mcp"}}}}"#,
        addr
    ));

    let session = BridgeSession::new(config, "d1-database", Duration::from_secs(1)).expect("Failed to create session");
    session
        .attach(UpstreamClient::new("d1-database", Box::new(fake_d1()), TIMEOUT))
        .await;

    let (slow, fast) = tokio::join!(
        session.invoke("slow", "anything", serde_json::Map::new()),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::time::timeout(Duration::from_millis(500), session.call_tool("query", serde_json::Map::new())).await
        }
    );

    let fast = fast.expect("primary call waited on the slow connect");
    assert!(!fast.is_error);
    assert_eq!(fast.text, "ok");
    assert!(slow.is_err());
    drop(listener);
}

#[tokio::test]
async fn test_slash_missing_input() {
    let mut h = harness(vec![]).await;
    let (out, is_error) = call(&mut h.server, "slash_command", json!({})).await;
    assert!(is_error);
    assert!(out.contains("input"));
}

#[tokio::test]
async fn test_slash_travel_on_attached_prompt_server() {
    let mut h = harness(vec![]).await;
    let prompt_server = FakeUpstream {
        tools: vec![],
        results: HashMap::from([(
            "initialize_travel_assistant".to_string(),
            text("You are a travel assistant."),
        )]),
        calls: Arc::new(Mutex::new(Vec::new())),
    };
    h.server
        .session()
        .attach(UpstreamClient::new("prompt-server", Box::new(prompt_server), TIMEOUT))
        .await;

    let (out, is_error) = call(&mut h.server, "slash_command", json!({"input": "/t"})).await;
    assert!(!is_error);
    assert_eq!(out, "✅ **Travel Assistant Initialized**\n\nYou are a travel assistant.");
}

// =============================================================================
// Dispatcher Pipeline
// =============================================================================

#[test]
fn test_repeated_command_resolves_once() {
    let dispatcher = CommandDispatcher::with_builtins();
    let context = CommandContext::default();

    let first = dispatcher.execute("/prompts list", &context);
    let second = dispatcher.execute("/prompts list", &context);
    assert_eq!(first, second);
    assert_eq!(dispatcher.tracker().len(), 1);

    let raw = r#"[{"name": "a", "category": "travel"}]"#;
    assert!(dispatcher.resolve("/prompts list", raw).starts_with("# Available Prompts"));
    assert_eq!(dispatcher.resolve("/prompts list", raw), raw);
}

#[test]
fn test_unrelated_results_pass_through() {
    let dispatcher = CommandDispatcher::with_builtins();
    assert_eq!(dispatcher.resolve("/never issued", "plain"), "plain");
}

#[test]
fn test_legacy_directive_text() {
    let dispatcher = CommandDispatcher::with_builtins();
    let out = dispatcher.execute("/travel", &CommandContext::default());
    assert!(matches!(out, CommandOutput::Defer { .. }));
    assert_eq!(out.to_string(), "use_tool_from_server prompt-server initialize_travel_assistant");
}
