use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::model::config::ServerConfig;
use crate::remote::{ToolClient, ToolError};

const PROTOCOL_VERSION: &str = "2024-11-05";

type Reader = Lines<BufReader<Box<dyn AsyncRead + Unpin + Send>>>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

struct Pipes {
    reader: Reader,
    writer: Writer,
}

/// MCP client over newline-delimited JSON-RPC.
///
/// One request is on the wire at a time; overlapping callers queue on the
/// pipe lock and each waits for the response carrying its own id.
pub struct McpClient {
    pipes: Mutex<Pipes>,
    next_id: AtomicU64,
    timeout: Duration,
    // Held so the server is killed when the client is dropped
    _child: Option<Child>,
}

impl McpClient {
    /// Launch the configured server and run the initialize handshake
    pub async fn spawn(config: &ServerConfig) -> Result<McpClient, ToolError> {
        debug!(command = %config.command, args = ?config.args, "starting task store server");
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Transport(format!("failed to start `{}`: {e}", config.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Transport("failed to open server stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Transport("failed to open server stdout".into()))?;

        let mut client = McpClient::from_pipes(stdout, stdin, Duration::from_millis(config.timeout_ms));
        client._child = Some(child);
        client.initialize().await?;
        Ok(client)
    }

    /// Wrap an already-connected pair of pipes. The handshake is not run.
    pub fn from_pipes<R, W>(reader: R, writer: W, timeout: Duration) -> McpClient
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let reader: Box<dyn AsyncRead + Unpin + Send> = Box::new(reader);
        McpClient {
            pipes: Mutex::new(Pipes {
                reader: BufReader::new(reader).lines(),
                writer: Box::new(writer),
            }),
            next_id: AtomicU64::new(1),
            timeout,
            _child: None,
        }
    }

    pub async fn initialize(&self) -> Result<(), ToolError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let response = self.request("initialize", params).await?;
        if let Some(error) = response.get("error") {
            return Err(ToolError::Protocol(format!("initialize failed: {}", error_message(error))));
        }
        self.notify("notifications/initialized").await
    }

    async fn notify(&self, method: &str) -> Result<(), ToolError> {
        let frame = json!({ "jsonrpc": "2.0", "method": method });
        let mut pipes = self.pipes.lock().await;
        write_frame(&mut pipes.writer, &frame).await
    }

    /// Send one request and wait for the response with the same id
    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut pipes = self.pipes.lock().await;
        let pipes = &mut *pipes;
        write_frame(&mut pipes.writer, &frame).await?;

        match tokio::time::timeout(self.timeout, read_response(&mut pipes.reader, id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(method, id, "task store did not answer in time");
                Err(ToolError::Transport(format!(
                    "no response to `{method}` within {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

impl ToolClient for McpClient {
    async fn call_tool(&self, name: &str, args: Value) -> Result<String, ToolError> {
        debug!(tool = name, "calling tool");
        let response = self
            .request("tools/call", json!({ "name": name, "arguments": args }))
            .await?;
        let result = extract_result(&response);
        if let Err(err) = &result {
            debug!(tool = name, error = %err, "tool call failed");
        }
        result
    }
}

async fn write_frame(writer: &mut Writer, frame: &Value) -> Result<(), ToolError> {
    let mut bytes = serde_json::to_vec(frame)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_response(reader: &mut Reader, id: u64) -> Result<Value, ToolError> {
    loop {
        let line = reader
            .next_line()
            .await?
            .ok_or_else(|| ToolError::Transport("server closed the connection".into()))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: Value = serde_json::from_str(&line)?;
        if frame.get("id").and_then(Value::as_u64) == Some(id) {
            return Ok(frame);
        }
        // Notifications, logs and answers to abandoned requests
        trace!(line = %line, "skipping unrelated frame");
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string()
}

/// Text of a `tools/call` response.
///
/// A JSON-RPC error or a result flagged `isError` becomes
/// [`ToolError::Rejected`] carrying the store's own message.
pub fn extract_result(response: &Value) -> Result<String, ToolError> {
    if let Some(error) = response.get("error") {
        return Err(ToolError::Rejected {
            message: error_message(error),
        });
    }

    let result = response
        .get("result")
        .ok_or_else(|| ToolError::Protocol("response has neither result nor error".into()))?;
    let text = result
        .get("content")
        .and_then(Value::as_array)
        .map(|content| {
            content
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .ok_or_else(|| ToolError::Protocol("result has no content".into()))?;

    if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        return Err(ToolError::Rejected { message: text });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn extract_text_content() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {
                "content": [
                    { "type": "text", "text": "line one" },
                    { "type": "image", "data": "..." },
                    { "type": "text", "text": "line two" }
                ]
            }
        });
        assert_eq!(extract_result(&response).unwrap(), "line one\nline two");
    }

    #[test]
    fn extract_tool_error() {
        let flagged = json!({
            "id": 2,
            "result": {
                "isError": true,
                "content": [{ "type": "text", "text": "dairesel bağımlılık tespit edildi" }]
            }
        });
        assert_eq!(
            extract_result(&flagged),
            Err(ToolError::Rejected {
                message: "dairesel bağımlılık tespit edildi".into()
            })
        );

        let rpc = json!({ "id": 2, "error": { "code": -32602, "message": "unknown tool" } });
        assert_eq!(
            extract_result(&rpc),
            Err(ToolError::Rejected {
                message: "unknown tool".into()
            })
        );
    }

    #[test]
    fn extract_rejects_empty_frame() {
        assert!(matches!(
            extract_result(&json!({ "id": 1 })),
            Err(ToolError::Protocol(_))
        ));
    }

    /// Minimal in-process server: answers initialize and one tools/call,
    /// interleaving a notification and a stale response.
    async fn fake_server(
        reader: tokio::io::DuplexStream,
        mut writer: tokio::io::DuplexStream,
    ) -> Vec<Value> {
        let mut lines = BufReader::new(reader).lines();
        let mut seen = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            let frame: Value = serde_json::from_str(&line).unwrap();
            seen.push(frame.clone());
            let Some(id) = frame.get("id").cloned() else {
                continue;
            };
            let reply = match frame["method"].as_str() {
                Some("initialize") => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
                _ => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": { "content": [{ "type": "text", "text": "ok" }] }
                }),
            };
            let noise = json!({ "jsonrpc": "2.0", "method": "notifications/message" });
            let stale = json!({ "jsonrpc": "2.0", "id": 999, "result": {} });
            for out in [noise, stale, reply] {
                let mut bytes = serde_json::to_vec(&out).unwrap();
                bytes.push(b'\n');
                writer.write_all(&bytes).await.unwrap();
            }
        }
        seen
    }

    #[tokio::test]
    async fn handshake_then_tool_call() {
        let (client_out, server_in) = tokio::io::duplex(4096);
        let (server_out, client_in) = tokio::io::duplex(4096);
        let server = tokio::spawn(fake_server(server_in, server_out));

        let client = McpClient::from_pipes(client_in, client_out, Duration::from_secs(5));
        client.initialize().await.unwrap();
        let text = client
            .call_tool("gorev_listele", json!({ "tum_projeler": true }))
            .await
            .unwrap();
        assert_eq!(text, "ok");
        drop(client);

        let seen = server.await.unwrap();
        let methods: Vec<&str> = seen.iter().filter_map(|f| f["method"].as_str()).collect();
        assert_eq!(methods, vec!["initialize", "notifications/initialized", "tools/call"]);
        assert_eq!(seen[2]["params"]["name"], "gorev_listele");
        assert_eq!(seen[0]["params"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn closed_pipe_is_a_transport_error() {
        let (client_out, _server_in) = tokio::io::duplex(4096);
        let (server_out, client_in) = tokio::io::duplex(4096);
        drop(server_out);
        let client = McpClient::from_pipes(client_in, client_out, Duration::from_secs(5));
        let err = client.call_tool("ozet_goster", json!({})).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let (client_out, _server_in) = tokio::io::duplex(4096);
        let (_server_out, client_in) = tokio::io::duplex(4096);
        let client = McpClient::from_pipes(client_in, client_out, Duration::from_millis(20));
        let err = client.call_tool("ozet_goster", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("within 20ms"), "{err}");
    }
}
