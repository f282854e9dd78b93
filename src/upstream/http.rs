//! Streamable HTTP transport: each JSON-RPC message is POSTed to one endpoint.
//!
//! Responses come back either as a plain JSON body or as a short
//! `text/event-stream` whose `data:` events carry JSON-RPC messages.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::{same_id, Transport};
use crate::error::{BridgeError, Result};
use crate::jsonrpc::{is_response, JsonRpcRequest, JsonRpcResponse};

const SESSION_HEADER: &str = "mcp-session-id";

/// Transport to an upstream server reachable over HTTP.
pub struct HttpTransport {
    server: String,
    url: String,
    client: reqwest::Client,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    /// Build a client for `url`, sending `headers` on every request.
    pub fn new(server: &str, url: &str, headers: &HashMap<String, String>) -> Result<Self> {
        let mut defaults = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| BridgeError::InvalidArg {
                name: format!("headers.{}", name),
                reason: e.to_string(),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| BridgeError::InvalidArg {
                name: format!("headers.{}", name),
                reason: e.to_string(),
            })?;
            defaults.insert(name, value);
        }
        defaults.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );

        let client = reqwest::Client::builder().default_headers(defaults).build()?;
        Ok(Self {
            server: server.to_string(),
            url: url.to_string(),
            client,
            session_id: Mutex::new(None),
        })
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<reqwest::Response> {
        let mut builder = self.client.post(&self.url).json(message);
        let session = self.session_id.lock().clone();
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }

        let response = builder.send().await?;
        if let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock() = Some(id.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::upstream(
                &self.server,
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let sent_id = request
            .id
            .clone()
            .ok_or_else(|| BridgeError::Internal("request without id".to_string()))?;

        let response = self.post(&request).await?;
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/event-stream"))
            .unwrap_or(false);
        let body = response.text().await?;

        let message = if is_stream {
            sse_messages(&body)
                .into_iter()
                .find(|m| is_response(m) && m.get("id").map(|id| same_id(&sent_id, id)).unwrap_or(false))
                .ok_or_else(|| BridgeError::upstream(&self.server, "event stream ended without a response"))?
        } else {
            serde_json::from_str::<JsonValue>(&body)?
        };

        Ok(serde_json::from_value(message)?)
    }

    async fn notify(&self, notification: JsonRpcRequest) -> Result<()> {
        self.post(&notification).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let session = self.session_id.lock().take();
        if let Some(id) = session {
            // Servers that do not support explicit termination answer 405; either way we are done.
            let result = self.client.delete(&self.url).header(SESSION_HEADER, id).send().await;
            if let Err(e) = result {
                tracing::debug!(server = %self.server, error = %e, "session termination failed");
            }
        }
        Ok(())
    }
}

/// Decode the JSON payloads of every event in an SSE body.
fn sse_messages(body: &str) -> Vec<JsonValue> {
    fn flush(data: &mut String, messages: &mut Vec<JsonValue>) {
        if !data.is_empty() {
            if let Ok(value) = serde_json::from_str::<JsonValue>(data) {
                messages.push(value);
            }
            data.clear();
        }
    }

    let mut messages = Vec::new();
    let mut data = String::new();

    for line in body.lines() {
        if line.is_empty() {
            flush(&mut data, &mut messages);
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    flush(&mut data, &mut messages);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_messages_split_events() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n\
                    event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{}}\n\n";
        let messages = sse_messages(body);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["id"], 7);
    }

    #[test]
    fn test_sse_multiline_data_and_no_trailing_blank() {
        let body = "data: {\"jsonrpc\":\"2.0\",\ndata: \"id\":1,\"result\":null}";
        let messages = sse_messages(body);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["id"], 1);
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(HttpTransport::new("remote", "http://localhost", &headers).is_err());
    }
}
