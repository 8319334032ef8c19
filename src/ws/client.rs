//! WebSocket connection configuration and socket connectors.
//!
//! The subscription engine never talks to `reqwest_websocket` directly. It
//! asks a [`Connector`] for a [`Socket`]: a sink of outgoing text frames and
//! a stream of incoming text frames. [`ReqwestConnector`] is the production
//! implementation; tests plug in scripted sockets.
//!
//! # Keepalive Behavior
//!
//! Protocol-level ping/pong frames are answered by the transport. On top of
//! that the exchange expects an application-level `ping` frame every
//! `pingInterval` milliseconds, which the connection sends on its own.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, warn};
use web_time::Duration;

use super::models::WebSocketEvent;
use crate::errors::WSErrors;

/// Default handshake timeout in seconds.
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default time to wait for a control frame ack in seconds.
const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 5;
/// Default first reconnect delay in seconds.
const DEFAULT_RECONNECT_INTERVAL_SECS: u64 = 5;
/// Default upper bound for the reconnect delay in seconds.
const DEFAULT_MAX_RECONNECT_INTERVAL_SECS: u64 = 60;

/// Outgoing half of a socket.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = WSErrors> + Send>>;
/// Incoming half of a socket. The stream ending means the socket dropped.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, WSErrors>> + Send>>;

/// Callback receiving lifecycle notifications and a free-form detail string.
pub type EventCallback = Arc<dyn Fn(WebSocketEvent, &str) + Send + Sync>;

/// A connected socket, split into its two halves.
pub struct Socket {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens sockets for a fully formed WebSocket URL.
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Socket, WSErrors>>;
}

/// [`Connector`] backed by `reqwest-websocket`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestConnector {
    client: reqwest::Client,
}

impl ReqwestConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Connector for ReqwestConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Socket, WSErrors>> {
        Box::pin(async move {
            use reqwest_websocket::{Message, Upgrade};

            let response = self.client.get(url).upgrade().send().await?;
            let websocket = response.into_websocket().await?;
            let (sink, stream) = websocket.split();

            let sink = sink
                .with(|text: String| {
                    future::ready(Ok::<_, reqwest_websocket::Error>(Message::Text(text)))
                })
                .sink_map_err(WSErrors::from);

            let stream = stream.filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(Message::Binary(data)) => Some(Ok(String::from_utf8_lossy(&data).into_owned())),
                    Ok(Message::Close { code, reason }) => {
                        debug!(?code, %reason, "server sent close frame");
                        Some(Err(WSErrors::WsClosed { code, reason }))
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(e.into())),
                })
            });

            Ok(Socket {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        })
    }
}

/// How inbound data frames reach subscribers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Callbacks run on the receive task. A slow callback delays every later
    /// frame of the same connection.
    #[default]
    Inline,
    /// Frames are handed to a bounded queue drained by a dedicated dispatch
    /// task. Order is preserved; the receive task waits when the queue is full.
    Queued { capacity: usize },
}

/// Configuration for WebSocket connection behavior.
///
/// # Example
///
/// ```
/// use kucoin_rust_sdk::ws::{DispatchMode, WebsocketConfig};
/// use web_time::Duration;
///
/// let config = WebsocketConfig {
///     reconnect_attempts: Some(10),
///     dispatch: DispatchMode::Queued { capacity: 1024 },
///     ..WebsocketConfig::default()
/// }
/// .with_event_callback(|event, detail| println!("{event:?}: {detail}"));
/// assert_eq!(config.connection_timeout, Duration::from_secs(10));
/// ```
#[derive(Clone)]
pub struct WebsocketConfig {
    /// How long to wait for the socket to open and the server's welcome.
    ///
    /// Default: 10 seconds
    pub connection_timeout: Duration,
    /// How long to wait for the ack of a subscribe/unsubscribe frame.
    ///
    /// Default: 5 seconds
    pub write_timeout: Duration,
    /// Reconnect automatically after an unexpected disconnect.
    pub reconnect: bool,
    /// Consecutive failed reconnect attempts before giving up; `None` retries forever.
    pub reconnect_attempts: Option<u32>,
    /// Delay before the first reconnect attempt. Doubles after each failure.
    pub reconnect_interval: Duration,
    /// Upper bound for the reconnect delay.
    pub max_reconnect_interval: Duration,
    pub dispatch: DispatchMode,
    pub event_callback: Option<EventCallback>,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
            reconnect: true,
            reconnect_attempts: None,
            reconnect_interval: Duration::from_secs(DEFAULT_RECONNECT_INTERVAL_SECS),
            max_reconnect_interval: Duration::from_secs(DEFAULT_MAX_RECONNECT_INTERVAL_SECS),
            dispatch: DispatchMode::Inline,
            event_callback: None,
        }
    }
}

impl fmt::Debug for WebsocketConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebsocketConfig")
            .field("connection_timeout", &self.connection_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("reconnect", &self.reconnect)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("max_reconnect_interval", &self.max_reconnect_interval)
            .field("dispatch", &self.dispatch)
            .field("event_callback", &self.event_callback.is_some())
            .finish()
    }
}

impl WebsocketConfig {
    /// Replace the event callback, keeping every other setting.
    pub fn with_event_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(WebSocketEvent, &str) + Send + Sync + 'static,
    {
        self.event_callback = Some(Arc::new(callback));
        self
    }

    /// Delay before reconnect attempt number `attempt` (zero based).
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.reconnect_interval
            .saturating_mul(factor)
            .min(self.max_reconnect_interval)
    }
}

/// Delivers [`WebSocketEvent`]s to the optional user callback.
#[derive(Clone, Default)]
pub(crate) struct EventNotifier {
    callback: Option<EventCallback>,
}

impl EventNotifier {
    pub(crate) fn new(callback: Option<EventCallback>) -> Self {
        Self { callback }
    }

    pub(crate) fn notify(&self, event: WebSocketEvent, detail: &str) {
        let Some(callback) = &self.callback else {
            return;
        };
        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(event, detail)));
        if result.is_err() {
            warn!(?event, "event callback panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_default_config() {
        let config = WebsocketConfig::default();
        assert!(config.reconnect);
        assert_eq!(config.reconnect_attempts, None);
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(config.dispatch, DispatchMode::Inline);
        assert!(config.event_callback.is_none());
    }

    #[test]
    fn test_reconnect_backoff_is_capped() {
        let config = WebsocketConfig {
            reconnect_interval: Duration::from_secs(1),
            max_reconnect_interval: Duration::from_secs(30),
            ..WebsocketConfig::default()
        };
        assert_eq!(config.reconnect_delay(0), Duration::from_secs(1));
        assert_eq!(config.reconnect_delay(1), Duration::from_secs(2));
        assert_eq!(config.reconnect_delay(2), Duration::from_secs(4));
        assert_eq!(config.reconnect_delay(10), Duration::from_secs(30));
        assert_eq!(config.reconnect_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_notifier_survives_panicking_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let config = WebsocketConfig::default().with_event_callback(move |event, detail| {
            if event == WebSocketEvent::ClientFail {
                panic!("boom");
            }
            sink.lock().unwrap().push((event, detail.to_string()));
        });

        let notifier = EventNotifier::new(config.event_callback);
        notifier.notify(WebSocketEvent::ClientFail, "");
        notifier.notify(WebSocketEvent::Connected, "ok");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(WebSocketEvent::Connected, "ok".to_string())]
        );
    }
}
