//! WebSocket transport.
//!
//! # Responsibilities
//! - Own the socket, the pending map and the connection state in one task
//! - Queue requests while disconnected and flush them in id order on open
//! - Reconnect after unexpected closes, replaying unanswered requests
//! - Publish open/close/error/notice/message-error events
//!
//! # Data Flow
//! ```text
//! WsTransport (cloneable handle)
//!     ── Command::{Connect, Disconnect, Send} ──▶ actor task
//!                                                 │ select! over:
//!                                                 │   commands
//!                                                 │   connect attempt
//!                                                 │   inbound frames
//!                                                 │   earliest request deadline
//!                                                 │   reconnect timer
//!     ◀── oneshot reply ───────────────────────── pending map
//!     ◀── broadcast TransportEvent / watch ConnectionState
//! ```
//!
//! # Design Decisions
//! - `active` records that the caller wants a live connection; only then
//!   does a close trigger a reconnect
//! - Explicit `disconnect` rejects everything pending with `Closed`
//! - A failed write rejects that one request and drops the connection;
//!   the rest are replayed after reconnecting
//! - Dropping every handle stops the task and rejects what is left

use std::future::pending;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::schema::ClientConfig;
use crate::error::{Error, TransportError};
use crate::observability::metrics;
use crate::resilience::backoff::reconnect_delay;
use crate::transport::pending::{PendingRequests, Reply};
use crate::transport::{parse_inbound, ConnectionState, Inbound, RpcRequest, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the event channel; slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 64;

/// Settings for [`WsTransport`].
#[derive(Debug, Clone)]
pub struct WsOptions {
    pub url: String,
    pub connect_timeout: Duration,
    pub max_reconnect_delay_ms: u64,
    pub reconnect_jitter: bool,
    /// Start connecting on the first `send` instead of waiting for `connect`.
    pub auto_connect: bool,
}

impl WsOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            max_reconnect_delay_ms: 10_000,
            reconnect_jitter: false,
            auto_connect: true,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            url: config.node.url.clone(),
            connect_timeout: Duration::from_millis(config.node.connect_timeout_ms),
            max_reconnect_delay_ms: config.reconnect.max_delay_ms,
            reconnect_jitter: config.reconnect.jitter,
            auto_connect: config.node.auto_connect,
        }
    }
}

enum Command {
    Connect(oneshot::Sender<Result<(), TransportError>>),
    Disconnect(oneshot::Sender<()>),
    Send {
        request: RpcRequest,
        timeout: Option<Duration>,
        reply: Reply,
    },
}

/// Handle to the WebSocket actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WsTransport {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<TransportEvent>,
    state: watch::Receiver<ConnectionState>,
}

impl WsTransport {
    /// Spawn the actor. Must be called inside a tokio runtime.
    pub fn new(options: WsOptions) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);

        let actor = Actor {
            options,
            commands: command_rx,
            events: events.clone(),
            state: state_tx,
            pending: PendingRequests::new(),
            socket: None,
            connecting: None,
            connect_waiters: Vec::new(),
            active: false,
            failures: 0,
            reconnect_at: None,
        };
        tokio::spawn(actor.run());

        Self {
            commands,
            events,
            state,
        }
    }

    /// Open the connection, or join the attempt already in progress.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Connect(tx))
            .map_err(|_| TransportError::Closed)?;
        rx.await.unwrap_or(Err(TransportError::Closed))
    }

    /// Close the connection without reconnecting. Pending requests are
    /// rejected with [`TransportError::Closed`].
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Disconnect(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn send(
        &self,
        request: RpcRequest,
        timeout: Option<Duration>,
    ) -> Result<Value, Error> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                request,
                timeout,
                reply,
            })
            .map_err(|_| TransportError::Closed)?;
        rx.await.unwrap_or_else(|_| Err(TransportError::Closed.into()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

struct Actor {
    options: WsOptions,
    commands: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<TransportEvent>,
    state: watch::Sender<ConnectionState>,
    pending: PendingRequests,
    socket: Option<WsStream>,
    connecting: Option<JoinHandle<Result<WsStream, TransportError>>>,
    connect_waiters: Vec<oneshot::Sender<Result<(), TransportError>>>,
    active: bool,
    /// Consecutive failed or lost connections since the last open.
    failures: u32,
    reconnect_at: Option<Instant>,
}

impl Actor {
    async fn run(mut self) {
        loop {
            let deadline = self.pending.next_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                result = join_connect(&mut self.connecting) => self.on_connect_result(result).await,
                frame = next_frame(&mut self.socket) => self.on_frame(frame).await,
                _ = sleep_until_opt(deadline) => self.expire(),
                _ = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    metrics::record_reconnect();
                    self.start_connect();
                }
            }
        }
        self.shutdown().await;
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(waiter) => {
                if self.socket.is_some() {
                    let _ = waiter.send(Ok(()));
                    return;
                }
                self.active = true;
                self.connect_waiters.push(waiter);
                if self.connecting.is_none() {
                    self.reconnect_at = None;
                    self.start_connect();
                }
            }
            Command::Disconnect(done) => {
                self.disconnect().await;
                let _ = done.send(());
            }
            Command::Send {
                request,
                timeout,
                reply,
            } => {
                let id = request.id;
                self.pending.insert(request, reply, timeout);
                metrics::set_pending_requests(self.pending.len());
                if self.socket.is_some() {
                    self.write(id).await;
                } else if !self.active && self.options.auto_connect {
                    self.active = true;
                    self.start_connect();
                } else {
                    tracing::debug!(id, "request queued until the connection opens");
                }
            }
        }
    }

    fn start_connect(&mut self) {
        if self.connecting.is_some() {
            return;
        }
        self.set_state(ConnectionState::Connecting);
        let url = self.options.url.clone();
        let limit = self.options.connect_timeout;
        tracing::debug!(url = %url, "connecting");

        self.connecting = Some(tokio::spawn(async move {
            match tokio::time::timeout(limit, connect_async(url)).await {
                Ok(Ok((stream, _response))) => Ok(stream),
                Ok(Err(e)) => Err(TransportError::websocket(e)),
                Err(_) => Err(TransportError::WebSocket {
                    message: format!("connect timed out after {limit:?}"),
                    source: None,
                }),
            }
        }));
    }

    async fn on_connect_result(&mut self, result: Result<WsStream, TransportError>) {
        match result {
            Ok(stream) => {
                tracing::info!(url = %self.options.url, "websocket connected");
                self.socket = Some(stream);
                self.failures = 0;
                self.set_state(ConnectionState::Open);
                self.emit(TransportEvent::Open);
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Ok(()));
                }
                self.flush().await;
            }
            Err(error) => {
                tracing::warn!(url = %self.options.url, error = %error, "websocket connect failed");
                self.set_state(ConnectionState::Disconnected);
                self.emit(TransportEvent::Error(error.clone()));
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Err(error.clone()));
                }
                if self.active {
                    self.schedule_reconnect();
                }
            }
        }
    }

    /// Write every request the current socket has not seen, lowest id first.
    async fn flush(&mut self) {
        for id in self.pending.unsent() {
            if self.socket.is_none() {
                break;
            }
            self.write(id).await;
        }
    }

    async fn write(&mut self, id: u64) {
        let Some(request) = self.pending.request(id) else {
            return;
        };
        let payload = match serde_json::to_string(request) {
            Ok(payload) => payload,
            Err(e) => {
                self.pending
                    .resolve(id, Err(TransportError::Message(e.to_string()).into()));
                return;
            }
        };
        let Some(socket) = self.socket.as_mut() else {
            return;
        };

        match socket.send(Message::text(payload)).await {
            Ok(()) => self.pending.mark_sent(id),
            Err(e) => self.on_write_failed(id, TransportError::websocket(e)),
        }
    }

    /// Reject `id`, drop the socket and leave the rest for the next connection.
    fn on_write_failed(&mut self, id: u64, error: TransportError) {
        tracing::warn!(id, error = %error, "websocket write failed");
        self.pending.resolve(id, Err(error.clone().into()));
        metrics::set_pending_requests(self.pending.len());
        self.emit(TransportEvent::Error(error));
        self.socket = None;
        self.on_closed(Some("write failed".to_string()));
    }

    async fn on_frame(&mut self, frame: Option<Result<Message, tungstenite::Error>>) {
        match frame {
            None => {
                self.socket = None;
                self.on_closed(None);
            }
            Some(Err(e)) => {
                let error = TransportError::websocket(e);
                self.emit(TransportEvent::Error(error.clone()));
                self.socket = None;
                self.on_closed(Some(error.to_string()));
            }
            Some(Ok(Message::Text(text))) => self.on_text(text.as_str()),
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.on_text(text),
                Err(e) => self.on_message_error(
                    String::from_utf8_lossy(&bytes).into_owned(),
                    TransportError::Message(e.to_string()),
                ),
            },
            Some(Ok(Message::Close(frame))) => {
                self.socket = None;
                self.on_closed(frame.map(|f| f.reason.as_str().to_string()));
            }
            Some(Ok(_)) => {}
        }
    }

    fn on_text(&mut self, text: &str) {
        match parse_inbound(text) {
            Ok(Inbound::Notice(params)) => self.emit(TransportEvent::Notice(params)),
            Ok(Inbound::Response { id, outcome }) => {
                if self.pending.resolve(id, outcome.map_err(Error::from)) {
                    metrics::set_pending_requests(self.pending.len());
                } else {
                    tracing::debug!(id, "dropping response for a request no longer pending");
                }
            }
            Err(error) => self.on_message_error(text.to_string(), error),
        }
    }

    fn on_message_error(&mut self, raw: String, error: TransportError) {
        tracing::warn!(error = %error, "malformed message from node");
        metrics::record_message_error();
        self.emit(TransportEvent::MessageError { raw, error });
    }

    /// The socket is gone without the caller asking for it.
    fn on_closed(&mut self, reason: Option<String>) {
        tracing::info!(reason = reason.as_deref().unwrap_or("none"), "websocket closed");
        self.set_state(ConnectionState::Disconnected);
        self.emit(TransportEvent::Close { reason });
        if self.active {
            self.pending.mark_all_unsent();
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(&mut self) {
        let delay = reconnect_delay(
            self.failures,
            self.options.max_reconnect_delay_ms,
            self.options.reconnect_jitter,
        );
        self.failures = self.failures.saturating_add(1);
        tracing::debug!(
            delay_ms = delay.as_millis() as u64,
            failures = self.failures,
            "reconnect scheduled"
        );
        self.reconnect_at = Some(Instant::now() + delay);
    }

    fn expire(&mut self) {
        let expired = self.pending.expire(Instant::now());
        for id in &expired {
            tracing::debug!(id, "request timed out");
            metrics::record_timeout();
        }
        metrics::set_pending_requests(self.pending.len());
    }

    async fn disconnect(&mut self) {
        self.active = false;
        self.reconnect_at = None;
        if let Some(task) = self.connecting.take() {
            task.abort();
        }
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(TransportError::Closed));
        }
        if let Some(mut socket) = self.socket.take() {
            self.set_state(ConnectionState::Closing);
            if let Err(e) = socket.close(None).await {
                tracing::debug!(error = %e, "close handshake failed");
            }
            self.emit(TransportEvent::Close {
                reason: Some("disconnect".to_string()),
            });
        }
        self.pending.reject_all(TransportError::Closed);
        metrics::set_pending_requests(0);
        self.set_state(ConnectionState::Disconnected);
    }

    async fn shutdown(&mut self) {
        self.disconnect().await;
        tracing::debug!("websocket transport stopped");
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: TransportEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn join_connect(
    task: &mut Option<JoinHandle<Result<WsStream, TransportError>>>,
) -> Result<WsStream, TransportError> {
    let Some(handle) = task.as_mut() else {
        return pending().await;
    };
    let result = handle.await;
    *task = None;
    result.unwrap_or_else(|e| {
        Err(TransportError::WebSocket {
            message: format!("connect task failed: {e}"),
            source: None,
        })
    })
}

async fn next_frame(
    socket: &mut Option<WsStream>,
) -> Option<Result<Message, tungstenite::Error>> {
    match socket.as_mut() {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
