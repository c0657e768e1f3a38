//! Shared mock node for integration tests.
//!
//! One axum server answers both WebSocket (`GET /` upgrade) and HTTP
//! (`POST /`) requests. Each test supplies a handler that decides what the
//! node does with a call.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A decoded `call` request as the node saw it.
#[derive(Debug, Clone)]
pub struct Call {
    pub id: u64,
    pub api: String,
    pub method: String,
    pub params: Value,
    /// 1 for the first WebSocket connection, 2 for the next, ... 0 for HTTP.
    pub connection: usize,
}

/// What the node does with a call.
#[derive(Debug, Clone)]
pub enum Action {
    Result(Value),
    Error(Value),
    /// Never answer.
    Silent,
    /// Answer after a delay.
    Delay(Duration, Value),
    /// Send a notice first, then the result.
    Notice(Value, Value),
    /// Send an unparseable frame first, then the result.
    Garbage(Value),
    /// Close the WebSocket without answering.
    Close,
    /// HTTP only: reply with this status and body.
    Status(u16, String),
}

type Handler = Box<dyn Fn(&Call) -> Action + Send + Sync>;

struct NodeState {
    handler: Handler,
    calls: Mutex<Vec<Call>>,
    connections: AtomicUsize,
}

/// A running mock node.
pub struct MockNode {
    pub addr: SocketAddr,
    state: Arc<NodeState>,
}

impl MockNode {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Call) -> Action + Send + Sync + 'static,
    {
        let state = Arc::new(NodeState {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/", get(ws_handler).post(http_handler))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    /// Echo `[method, params]` back as the result of every call.
    pub async fn echo() -> Self {
        Self::start(|call| Action::Result(json!([call.method, call.params]))).await
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    pub fn http_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn received_ids(&self) -> Vec<u64> {
        self.calls().iter().map(|call| call.id).collect()
    }

    /// WebSocket connections accepted so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }
}

/// A free local port with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

fn parse_call(body: &Value, connection: usize) -> Option<Call> {
    let params = body.get("params")?.as_array()?;
    Some(Call {
        id: body.get("id")?.as_u64()?,
        api: params.first()?.as_str()?.to_string(),
        method: params.get(1)?.as_str()?.to_string(),
        params: params.get(2).cloned().unwrap_or(Value::Null),
        connection,
    })
}

fn result_frame(id: u64, result: Value) -> String {
    json!({"id": id, "jsonrpc": "2.0", "result": result}).to_string()
}

fn error_frame(id: u64, error: Value) -> String {
    json!({"id": id, "jsonrpc": "2.0", "error": error}).to_string()
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<NodeState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<NodeState>) {
    let connection = state.connections.fetch_add(1, Ordering::SeqCst) + 1;
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(body) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        let Some(call) = parse_call(&body, connection) else {
            continue;
        };
        state.calls.lock().unwrap().push(call.clone());

        let send = |frame: String| {
            let _ = tx.send(Message::Text(frame.into()));
        };
        match (state.handler)(&call) {
            Action::Result(result) => send(result_frame(call.id, result)),
            Action::Error(error) => send(error_frame(call.id, error)),
            Action::Silent | Action::Status(..) => {}
            Action::Delay(after, result) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Message::Text(result_frame(call.id, result).into()));
                });
            }
            Action::Notice(params, result) => {
                send(json!({"method": "notice", "params": params}).to_string());
                send(result_frame(call.id, result));
            }
            Action::Garbage(result) => {
                send("{not json".to_string());
                send(result_frame(call.id, result));
            }
            Action::Close => {
                let _ = tx.send(Message::Close(None));
                break;
            }
        }
    }

    drop(tx);
    let _ = writer.await;
}

async fn http_handler(State(state): State<Arc<NodeState>>, Json(body): Json<Value>) -> Response {
    let Some(call) = parse_call(&body, 0) else {
        return (StatusCode::BAD_REQUEST, "bad request").into_response();
    };
    state.calls.lock().unwrap().push(call.clone());

    let json_body = |text: String| {
        (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            text,
        )
            .into_response()
    };
    match (state.handler)(&call) {
        Action::Result(result) | Action::Notice(_, result) | Action::Garbage(result) => {
            json_body(result_frame(call.id, result))
        }
        Action::Error(error) => json_body(error_frame(call.id, error)),
        Action::Delay(after, result) => {
            tokio::time::sleep(after).await;
            json_body(result_frame(call.id, result))
        }
        Action::Silent => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        Action::Status(code, text) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            text,
        )
            .into_response(),
        Action::Close => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
