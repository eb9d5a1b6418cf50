#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub const STEP_TIMEOUT: Duration = Duration::from_secs(3);

enum ConnectionCommand {
    SendJson(Value),
    ForceClose,
}

/// Server side of one client connection.
pub struct MockConnection {
    request_rx: mpsc::Receiver<Value>,
    command_tx: mpsc::Sender<ConnectionCommand>,
}

impl MockConnection {
    pub async fn recv_request(&mut self) -> Value {
        timeout(STEP_TIMEOUT, self.request_rx.recv())
            .await
            .expect("timed out waiting for request")
            .expect("mock connection request channel closed")
    }

    /// Next request, or `None` if nothing arrives within `wait`.
    pub async fn try_recv_request(&mut self, wait: Duration) -> Option<Value> {
        timeout(wait, self.request_rx.recv()).await.ok().flatten()
    }

    pub async fn recv_request_method(&mut self, expected_method: &str) -> Value {
        let request = self.recv_request().await;
        let method = request.get("method").and_then(Value::as_str);
        assert_eq!(method, Some(expected_method), "unexpected method request");
        request
    }

    /// Expect a request for `method`, answer it with `result`, and return
    /// the request.
    pub async fn respond(&mut self, method: &str, result: Value) -> Value {
        let request = self.recv_request_method(method).await;
        self.send_result(rpc_id(&request), result).await;
        request
    }

    pub async fn send_json(&self, value: Value) {
        self.command_tx
            .send(ConnectionCommand::SendJson(value))
            .await
            .expect("failed to send command to mock connection");
    }

    pub async fn send_result(&self, id: u64, result: Value) {
        self.send_json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }))
        .await;
    }

    pub async fn send_error(&self, id: u64, code: i32, message: &str) {
        self.send_json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "code": code,
                "message": message,
            }
        }))
        .await;
    }

    pub async fn push_sys(&self, event: &str) {
        self.send_json(json!({
            "sid": "mock-session",
            "time": 1_609_459_200.0,
            "sys": ["mentalCommand", event],
        }))
        .await;
    }

    pub async fn push_com(&self, label: &str, power: f64) {
        self.send_json(json!({
            "sid": "mock-session",
            "time": 1_609_459_201.0,
            "com": [label, power],
        }))
        .await;
    }

    pub async fn force_close(&self) {
        let _ = self.command_tx.send(ConnectionCommand::ForceClose).await;
    }
}

pub fn rpc_id(request: &Value) -> u64 {
    request
        .get("id")
        .and_then(Value::as_u64)
        .expect("request missing numeric id")
}

/// Plain `ws://` Cortex stand-in that hands each accepted connection to the
/// test.
pub struct MockCortexServer {
    addr: SocketAddr,
    connection_rx: mpsc::Receiver<MockConnection>,
    server_task: JoinHandle<()>,
}

impl MockCortexServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let (connection_tx, connection_rx) = mpsc::channel(16);

        let server_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let connection_tx = connection_tx.clone();

                tokio::spawn(async move {
                    let Ok(ws_stream) = accept_async(stream).await else {
                        return;
                    };

                    let (mut ws_sink, mut ws_source) = ws_stream.split();
                    let (request_tx, request_rx) = mpsc::channel(64);
                    let (command_tx, mut command_rx) = mpsc::channel(64);

                    let connection = MockConnection {
                        request_rx,
                        command_tx,
                    };
                    if connection_tx.send(connection).await.is_err() {
                        return;
                    }

                    loop {
                        tokio::select! {
                            maybe_command = command_rx.recv() => {
                                match maybe_command {
                                    Some(ConnectionCommand::SendJson(value)) => {
                                        let message = Message::Text(value.to_string().into());
                                        if ws_sink.send(message).await.is_err() {
                                            break;
                                        }
                                    }
                                    Some(ConnectionCommand::ForceClose) | None => {
                                        let _ = ws_sink.send(Message::Close(None)).await;
                                        break;
                                    }
                                }
                            }
                            maybe_message = ws_source.next() => {
                                match maybe_message {
                                    Some(Ok(Message::Text(text))) => {
                                        if let Ok(value) = serde_json::from_str::<Value>(&text) {
                                            let _ = request_tx.send(value).await;
                                        }
                                    }
                                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                                    Some(Ok(_)) => {}
                                }
                            }
                        }
                    }
                });
            }
        });

        Ok(Self {
            addr,
            connection_rx,
            server_task,
        })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn accept_connection(&mut self) -> MockConnection {
        timeout(STEP_TIMEOUT, self.connection_rx.recv())
            .await
            .expect("timed out waiting for client connection")
            .expect("mock server connection channel closed")
    }
}

impl Drop for MockCortexServer {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}
