//! Scripted in-process WebSocket server shared by the service tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::channel::mpsc::{self, UnboundedSender};
use futures::future::BoxFuture;
use kucoin_rust_sdk::WSErrors;
use kucoin_rust_sdk::ws::client::{FrameSink, FrameStream};
use kucoin_rust_sdk::ws::{
    Connector, Socket, StaticTokenProvider, WebSocketEvent, WebsocketConfig, WsService, WsToken,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use web_time::{Duration, Instant};

type Inbound = UnboundedSender<Result<String, WSErrors>>;

/// Fake exchange: acks control frames, answers pings and lets the test push
/// data frames or drop the socket.
#[derive(Default)]
pub struct MockServer {
    sent: Mutex<Vec<Value>>,
    connects: AtomicUsize,
    current: Mutex<Option<Inbound>>,
    /// Connections after this many successful ones are refused.
    accept_limit: Mutex<Option<usize>>,
    /// Topic prefixes answered with an error frame.
    rejected: Mutex<Vec<String>>,
    /// Frames queued right after the welcome of every new connection.
    greeting: Mutex<Vec<String>>,
    silent: Mutex<bool>,
    no_welcome: Mutex<bool>,
    mute_handshake: Mutex<bool>,
}

impl MockServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    /// Control frames of the given `type` the client sent, oldest first.
    pub fn sent_of(&self, kind: &str) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter(|frame| frame["type"] == kind)
            .cloned()
            .collect()
    }

    pub fn accept_only(&self, connections: usize) {
        *self.accept_limit.lock() = Some(connections);
    }

    pub fn reject(&self, prefix: &str) {
        self.rejected.lock().push(prefix.to_string());
    }

    pub fn greet_with(&self, frame: Value) {
        self.greeting.lock().push(frame.to_string());
    }

    /// Stop answering control frames.
    pub fn go_silent(&self) {
        *self.silent.lock() = true;
    }

    pub fn skip_welcome(&self) {
        *self.no_welcome.lock() = true;
    }

    /// Accept sockets but never send a first frame.
    pub fn mute_handshake(&self) {
        *self.mute_handshake.lock() = true;
    }

    /// Push a data frame on the live socket.
    pub fn push(&self, frame: Value) {
        if let Some(inbound) = self.current.lock().as_ref() {
            let _ = inbound.unbounded_send(Ok(frame.to_string()));
        }
    }

    pub fn push_message(&self, topic: &str, subject: &str, data: Value) {
        self.push(json!({
            "type": "message",
            "topic": topic,
            "subject": subject,
            "data": data,
        }));
    }

    /// End the live socket as if the network went away.
    pub fn drop_connection(&self) {
        if let Some(inbound) = self.current.lock().take() {
            inbound.close_channel();
        }
    }

    fn accept(self: &Arc<Self>) -> Result<Socket, WSErrors> {
        let count = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        if self.accept_limit.lock().is_some_and(|limit| count > limit) {
            return Err(WSErrors::WsConnectionError("connection refused".to_string()));
        }

        let (inbound, stream) = mpsc::unbounded();
        if !*self.mute_handshake.lock() {
            let welcome = if *self.no_welcome.lock() {
                json!({"id": "x", "type": "notice"})
            } else {
                json!({"id": format!("welcome-{count}"), "type": "welcome"})
            };
            let _ = inbound.unbounded_send(Ok(welcome.to_string()));
            for frame in self.greeting.lock().iter() {
                let _ = inbound.unbounded_send(Ok(frame.clone()));
            }
        }
        *self.current.lock() = Some(inbound.clone());

        let server = self.clone();
        let sink = futures::sink::unfold((), move |(), text: String| {
            server.receive(&inbound, &text);
            async { Ok::<(), WSErrors>(()) }
        });

        Ok(Socket {
            sink: Box::pin(sink) as FrameSink,
            stream: Box::pin(stream) as FrameStream,
        })
    }

    fn receive(&self, inbound: &Inbound, text: &str) {
        let Ok(frame) = serde_json::from_str::<Value>(text) else {
            return;
        };
        self.sent.lock().push(frame.clone());
        if *self.silent.lock() {
            return;
        }

        let id = frame["id"].clone();
        let reply = match frame["type"].as_str() {
            Some("ping") => json!({"id": id, "type": "pong"}),
            Some("subscribe") | Some("unsubscribe") => {
                let topic = frame["topic"].as_str().unwrap_or_default();
                if self.rejected.lock().iter().any(|p| topic.starts_with(p.as_str())) {
                    json!({"id": id, "type": "error", "code": 404, "data": format!("topic {topic} is not found")})
                } else {
                    json!({"id": id, "type": "ack"})
                }
            }
            _ => return,
        };
        let _ = inbound.unbounded_send(Ok(reply.to_string()));
    }
}

/// [`Connector`] that hands out sockets of a [`MockServer`].
pub struct MockConnector {
    pub server: Arc<MockServer>,
    pub urls: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new(server: Arc<MockServer>) -> Arc<Self> {
        Arc::new(Self {
            server,
            urls: Mutex::new(Vec::new()),
        })
    }
}

impl Connector for MockConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Socket, WSErrors>> {
        self.urls.lock().push(url.to_string());
        let socket = self.server.accept();
        Box::pin(async move { socket })
    }
}

pub fn token() -> WsToken {
    WsToken {
        token: "test-token".to_string(),
        endpoint: "ws://mock.local/endpoint".to_string(),
        encrypt: false,
        protocol: "websocket".to_string(),
        ping_interval: 60_000,
        ping_timeout: 10_000,
    }
}

/// Every lifecycle event the service reported, in order.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<(WebSocketEvent, String)>>>);

impl EventLog {
    pub fn all(&self) -> Vec<(WebSocketEvent, String)> {
        self.0.lock().clone()
    }

    pub fn count(&self, event: WebSocketEvent) -> usize {
        self.0.lock().iter().filter(|(e, _)| *e == event).count()
    }

    pub fn has(&self, event: WebSocketEvent) -> bool {
        self.count(event) > 0
    }
}

/// Fast timings suitable for tests, reporting events into `log`.
pub fn config(log: &EventLog) -> WebsocketConfig {
    let log = log.clone();
    WebsocketConfig {
        connection_timeout: Duration::from_secs(2),
        write_timeout: Duration::from_secs(2),
        reconnect_interval: Duration::from_millis(10),
        max_reconnect_interval: Duration::from_millis(50),
        ..WebsocketConfig::default()
    }
    .with_event_callback(move |event, detail| log.0.lock().push((event, detail.to_string())))
}

pub fn service(config: WebsocketConfig, private: bool, server: &Arc<MockServer>) -> WsService {
    WsService::new(
        config,
        private,
        Arc::new(StaticTokenProvider::new(vec![token()])),
        MockConnector::new(server.clone()),
    )
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
