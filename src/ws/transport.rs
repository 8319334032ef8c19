//! One logical WebSocket connection.
//!
//! A [`Connection`] owns a background task that holds the socket. The task
//! multiplexes outbound control frames, inbound frames, the keepalive ping and
//! the shutdown signal. When the socket drops it reconnects with a fresh
//! token and replays every live subscription before reading any new frame, so
//! subscribers never observe data from a half-restored session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::Future;
use futures::{FutureExt, SinkExt, StreamExt, select};
use futures_timer::Delay;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use url::Url;
use web_time::{Duration, Instant};

use super::client::{Connector, EventNotifier, Socket, WebsocketConfig};
use super::dispatcher::{DispatchHandle, Dispatcher};
use super::models::{MessageType, WebSocketEvent, WsMessage, WsToken};
use super::registry::{SubscriptionId, TopicRegistry};
use super::token::{WsTokenProvider, choose_token};
use crate::errors::WSErrors;

/// Outbound frames buffered between callers and the socket task.
const OUTBOUND_BUFFER: usize = 256;
/// Ping interval used when the token does not advertise one.
const DEFAULT_PING_INTERVAL_MS: u64 = 18_000;
/// How long `close` waits for the socket task before aborting it.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection state as seen by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// The socket dropped; a reconnect has not started yet.
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal: either stopped by the caller or failed for good.
    Closed,
}

/// Everything a [`Connection`] needs to open and restore its socket.
pub(crate) struct ConnectionParams {
    pub config: WebsocketConfig,
    pub private: bool,
    pub tokens: Arc<dyn WsTokenProvider>,
    pub connector: Arc<dyn Connector>,
    pub registry: Arc<TopicRegistry>,
}

type AckSender = oneshot::Sender<Result<(), WSErrors>>;

struct Shared {
    config: WebsocketConfig,
    private: bool,
    tokens: Arc<dyn WsTokenProvider>,
    connector: Arc<dyn Connector>,
    registry: Arc<TopicRegistry>,
    events: EventNotifier,
    state: Mutex<ConnectionState>,
    last_frame: Mutex<Instant>,
    pending: Mutex<HashMap<String, AckSender>>,
    /// Ids of resubscribe frames sent after a reconnect.
    replays: Mutex<HashMap<String, SubscriptionId>>,
    next_message_id: AtomicU64,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.lock();
        if *current != state {
            debug!(from = ?*current, to = ?state, "connection state change");
            *current = state;
        }
    }

    fn message_id(&self) -> String {
        self.next_message_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    fn touch(&self) {
        *self.last_frame.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_frame.lock().elapsed()
    }

    /// Complete the waiter (or replay) registered under `id`.
    fn resolve(&self, id: Option<&str>, result: Result<(), WSErrors>) {
        let Some(id) = id else {
            if let Err(e) = result {
                warn!(error = %e, "server error without message id");
                self.events
                    .notify(WebSocketEvent::ErrorReceived, &e.to_string());
            }
            return;
        };

        let replayed = self.replays.lock().remove(id);
        if let Some(subscription) = replayed {
            match result {
                Ok(()) => {
                    debug!(%subscription, "resubscribed");
                    self.events
                        .notify(WebSocketEvent::ReSubscribeOk, &subscription.to_string());
                }
                Err(e) => {
                    warn!(%subscription, error = %e, "resubscribe rejected, dropped");
                    self.registry.unregister(subscription);
                    self.events.notify(
                        WebSocketEvent::ReSubscribeError,
                        &format!("{subscription}: {e}"),
                    );
                }
            }
            return;
        }

        let waiter = self.pending.lock().remove(id);
        match waiter {
            Some(waiter) => {
                // the caller may have timed out already
                let _ = waiter.send(result);
            }
            None => {
                if let Err(e) = result {
                    warn!(id, error = %e, "server error for unknown message");
                    self.events
                        .notify(WebSocketEvent::ErrorReceived, &e.to_string());
                } else {
                    trace!(id, "ack without waiter");
                }
            }
        }
    }

    /// Fail every outstanding ack; the socket they were sent on is gone.
    fn fail_pending(&self) {
        let waiters: Vec<AckSender> = self.pending.lock().drain().map(|(_, tx)| tx).collect();
        for waiter in waiters {
            let _ = waiter.send(Err(WSErrors::WsStreamEnded));
        }
        self.replays.lock().clear();
    }

    /// Terminal failure: nothing will be delivered on this connection again.
    fn fail(&self, reason: &str) {
        error!(reason, "websocket connection failed permanently");
        self.set_state(ConnectionState::Closed);
        self.events.notify(WebSocketEvent::ClientFail, reason);
        for subscription in self.registry.clear() {
            self.events.notify(
                WebSocketEvent::SubscriptionClosed,
                &format!("{} {}", subscription.id(), subscription.topic()),
            );
        }
    }
}

/// Handle to a live connection and its socket task.
pub struct Connection {
    shared: Arc<Shared>,
    outbound: mpsc::Sender<String>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Fetch a token, open the socket and wait for the server's welcome.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) async fn open(params: ConnectionParams) -> Result<Self, WSErrors> {
        let events = EventNotifier::new(params.config.event_callback.clone());
        let shared = Arc::new(Shared {
            events: events.clone(),
            config: params.config,
            private: params.private,
            tokens: params.tokens,
            connector: params.connector,
            registry: params.registry,
            state: Mutex::new(ConnectionState::Connecting),
            last_frame: Mutex::new(Instant::now()),
            pending: Mutex::new(HashMap::new()),
            replays: Mutex::new(HashMap::new()),
            next_message_id: AtomicU64::new(1),
        });

        let (socket, token) = match dial(&shared).await {
            Ok(opened) => opened,
            Err(e) => {
                shared.set_state(ConnectionState::Closed);
                return Err(e);
            }
        };
        shared.touch();
        shared.set_state(ConnectionState::Connected);
        info!(endpoint = %token.endpoint, private = shared.private, "websocket connected");
        events.notify(WebSocketEvent::Connected, &token.endpoint);

        let dispatch = DispatchHandle::new(
            Dispatcher::new(shared.registry.clone(), events),
            shared.config.dispatch,
        );
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(
            shared.clone(),
            socket,
            token,
            outbound_rx,
            shutdown_rx,
            dispatch,
        ));

        Ok(Self {
            shared,
            outbound,
            shutdown: Mutex::new(Some(shutdown)),
            task: Mutex::new(Some(task)),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// A message id unique within this connection.
    pub fn next_message_id(&self) -> String {
        self.shared.message_id()
    }

    /// Send a control frame and wait up to `timeout` for its ack.
    ///
    /// Fails with [`WSErrors::NotConnected`] unless the connection is
    /// `Connected`, with [`WSErrors::WsServerError`] when the server answers
    /// with an error frame, and with [`WSErrors::AckTimeout`] when no answer
    /// arrives in time.
    pub async fn write(&self, msg: WsMessage, timeout: Duration) -> Result<(), WSErrors> {
        if self.state() != ConnectionState::Connected {
            return Err(WSErrors::NotConnected);
        }
        let id = msg
            .id
            .clone()
            .ok_or_else(|| WSErrors::InvalidArgument("control frame without id".to_string()))?;
        let text = serde_json::to_string(&msg)?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(id.clone(), tx);
        trace!(%id, kind = ?msg.kind, "queueing control frame");

        if self.outbound.send(text).await.is_err() {
            self.shared.pending.lock().remove(&id);
            return Err(WSErrors::NotConnected);
        }

        match with_timeout(rx, timeout).await {
            Some(Ok(result)) => result,
            Some(Err(_)) => Err(WSErrors::WsStreamEnded),
            None => {
                self.shared.pending.lock().remove(&id);
                Err(WSErrors::AckTimeout(id))
            }
        }
    }

    /// Stop the socket task and wait for it to finish. Idempotent.
    pub async fn close(&self) {
        let shutdown = self.shutdown.lock().take();
        let Some(shutdown) = shutdown else {
            return;
        };
        let _ = shutdown.send(());

        let task = self.task.lock().take();
        if let Some(task) = task {
            let abort = task.abort_handle();
            match with_timeout(task, CLOSE_TIMEOUT).await {
                Some(Ok(())) => {}
                Some(Err(e)) => warn!(error = %e, "socket task ended abnormally"),
                None => {
                    warn!("socket task did not stop in time, aborting");
                    abort.abort();
                }
            }
        }

        self.shared.fail_pending();
        self.shared.set_state(ConnectionState::Closed);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // dropping the shutdown sender ends the socket task
        if self.shutdown.get_mut().is_some() {
            debug!("connection dropped without close");
        }
    }
}

/// Resolve `fut`, or `None` once `timeout` elapses.
pub(crate) async fn with_timeout<F: Future>(fut: F, timeout: Duration) -> Option<F::Output> {
    select! {
        out = fut.fuse() => Some(out),
        _ = Delay::new(timeout).fuse() => None,
    }
}

/// Fetch a token, open a socket on one of its servers and complete the handshake.
async fn dial(shared: &Shared) -> Result<(Socket, WsToken), WSErrors> {
    let tokens = shared.tokens.get_token().await?;
    let token = choose_token(&tokens)?.clone();
    let url = connect_url(&token)?;
    let timeout = shared.config.connection_timeout;

    debug!(endpoint = %token.endpoint, "opening websocket");
    let mut socket = with_timeout(shared.connector.connect(url.as_str()), timeout)
        .await
        .ok_or(WSErrors::WsConnectionTimeout)??;

    with_timeout(wait_for_welcome(&mut socket), timeout)
        .await
        .ok_or(WSErrors::WsConnectionTimeout)??;

    Ok((socket, token))
}

fn connect_url(token: &WsToken) -> Result<Url, WSErrors> {
    let mut url = Url::parse(&token.endpoint)
        .map_err(|e| WSErrors::WsConnectionError(format!("{}: {e}", token.endpoint)))?;
    let connect_id = format!("{:016x}", rand::random::<u64>());
    url.query_pairs_mut()
        .append_pair("connectId", &connect_id)
        .append_pair("token", &token.token);
    Ok(url)
}

async fn wait_for_welcome(socket: &mut Socket) -> Result<(), WSErrors> {
    debug!("waiting for welcome message");
    let text = match socket.stream.next().await {
        Some(frame) => frame?,
        None => return Err(WSErrors::WsStreamEnded),
    };
    match serde_json::from_str::<WsMessage>(&text) {
        Ok(msg) if msg.kind == MessageType::Welcome => {
            debug!("got welcome message");
            Ok(())
        }
        _ => Err(WSErrors::WsHandshakeFailed(text)),
    }
}

/// Why the socket loop stopped.
enum Exit {
    Shutdown,
    Dropped(String),
}

enum Recovery {
    Connected(Socket, WsToken),
    Shutdown,
    Exhausted(u32),
}

async fn run(
    shared: Arc<Shared>,
    mut socket: Socket,
    mut token: WsToken,
    mut outbound: mpsc::Receiver<String>,
    mut shutdown: oneshot::Receiver<()>,
    dispatch: DispatchHandle,
) {
    'session: loop {
        let exit = drive(
            &shared,
            &mut socket,
            &token,
            &mut outbound,
            &mut shutdown,
            &dispatch,
        )
        .await;
        let mut reason = match exit {
            Exit::Shutdown => {
                if let Err(e) = socket.sink.close().await {
                    debug!(error = %e, "error closing socket");
                }
                info!("websocket stopped");
                break 'session;
            }
            Exit::Dropped(reason) => reason,
        };

        loop {
            warn!(%reason, "websocket disconnected");
            shared.set_state(ConnectionState::Disconnected);
            shared.fail_pending();
            shared.events.notify(WebSocketEvent::Disconnected, &reason);

            if !shared.config.reconnect {
                shared.fail(&format!("{reason}; reconnect is disabled"));
                break 'session;
            }
            shared.set_state(ConnectionState::Reconnecting);

            match reconnect(&shared, &mut shutdown).await {
                Recovery::Connected(new_socket, new_token) => {
                    socket = new_socket;
                    token = new_token;
                }
                Recovery::Shutdown => break 'session,
                Recovery::Exhausted(attempts) => {
                    shared.fail(&WSErrors::ReconnectExhausted(attempts).to_string());
                    break 'session;
                }
            }

            // frames queued for the dead socket were already failed
            while outbound.try_recv().is_ok() {}
            shared.touch();
            shared.set_state(ConnectionState::Connected);
            info!(endpoint = %token.endpoint, "websocket reconnected");
            shared
                .events
                .notify(WebSocketEvent::Connected, &token.endpoint);

            match replay(&shared, &mut socket).await {
                Ok(count) => {
                    debug!(count, "replayed subscriptions");
                    continue 'session;
                }
                Err(e) => reason = e.to_string(),
            }
        }
    }

    if shared.state() != ConnectionState::Closed {
        shared.set_state(ConnectionState::Closed);
    }
    dispatch.finish().await;
}

/// Pump the socket until it drops or shutdown is requested.
async fn drive(
    shared: &Shared,
    socket: &mut Socket,
    token: &WsToken,
    outbound: &mut mpsc::Receiver<String>,
    shutdown: &mut oneshot::Receiver<()>,
    dispatch: &DispatchHandle,
) -> Exit {
    let interval_ms = if token.ping_interval == 0 {
        DEFAULT_PING_INTERVAL_MS
    } else {
        token.ping_interval
    };
    let ping_every = Duration::from_millis(interval_ms);
    let max_idle = ping_every + Duration::from_millis(token.ping_timeout);
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + ping_every, ping_every);

    loop {
        tokio::select! {
            biased;
            _ = &mut *shutdown => return Exit::Shutdown,
            frame = socket.stream.next() => match frame {
                Some(Ok(text)) => {
                    shared.touch();
                    handle_frame(shared, &text, dispatch).await;
                }
                Some(Err(e)) => return Exit::Dropped(e.to_string()),
                None => return Exit::Dropped(WSErrors::WsStreamEnded.to_string()),
            },
            queued = outbound.recv() => match queued {
                Some(text) => {
                    if let Err(e) = socket.sink.send(text).await {
                        return Exit::Dropped(e.to_string());
                    }
                }
                None => return Exit::Shutdown,
            },
            _ = ping.tick() => {
                if shared.idle_for() > max_idle {
                    return Exit::Dropped(format!("no frame received for {max_idle:?}"));
                }
                let frame = WsMessage::ping(shared.message_id());
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => return Exit::Dropped(e.to_string()),
                };
                trace!("sending ping");
                if let Err(e) = socket.sink.send(text).await {
                    return Exit::Dropped(e.to_string());
                }
            }
        }
    }
}

async fn handle_frame(shared: &Shared, text: &str, dispatch: &DispatchHandle) {
    let msg: WsMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, frame = text, "undecodable frame");
            shared
                .events
                .notify(WebSocketEvent::ErrorReceived, &format!("{e}: {text}"));
            return;
        }
    };

    match msg.kind {
        MessageType::Message => dispatch.dispatch(msg).await,
        MessageType::Ack | MessageType::Pong => shared.resolve(msg.id.as_deref(), Ok(())),
        MessageType::Error => {
            let message = msg.error_message();
            shared.resolve(msg.id.as_deref(), Err(WSErrors::WsServerError { message }));
        }
        MessageType::Welcome => debug!("welcome on an established connection"),
        MessageType::Notice | MessageType::Command => {
            debug!(kind = ?msg.kind, topic = msg.topic(), "server notice")
        }
        other => trace!(kind = ?other, "ignoring frame"),
    }
}

/// Redial with exponential backoff until it succeeds, attempts run out or
/// shutdown is requested.
async fn reconnect(shared: &Shared, shutdown: &mut oneshot::Receiver<()>) -> Recovery {
    let mut failures: u32 = 0;
    loop {
        if shared
            .config
            .reconnect_attempts
            .is_some_and(|max| failures >= max)
        {
            return Recovery::Exhausted(failures);
        }

        let delay = shared.config.reconnect_delay(failures);
        tokio::select! {
            biased;
            _ = &mut *shutdown => return Recovery::Shutdown,
            _ = Delay::new(delay) => {}
        }

        let attempt = failures + 1;
        info!(attempt, "reconnecting websocket");
        shared
            .events
            .notify(WebSocketEvent::TryReconnect, &attempt.to_string());

        tokio::select! {
            biased;
            _ = &mut *shutdown => return Recovery::Shutdown,
            dialed = dial(shared) => match dialed {
                Ok((socket, token)) => return Recovery::Connected(socket, token),
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                    failures = attempt;
                }
            }
        }
    }
}

/// Resend a subscribe frame for every live subscription.
///
/// Acks are not awaited here: they arrive on the stream this task reads next,
/// and are reported through `ReSubscribeOk` / `ReSubscribeError` events.
async fn replay(shared: &Shared, socket: &mut Socket) -> Result<usize, WSErrors> {
    let subscriptions = shared.registry.snapshot();
    for subscription in &subscriptions {
        let id = shared.message_id();
        let frame = WsMessage::subscribe(id.clone(), subscription.topic().to_string(), shared.private);
        let text = serde_json::to_string(&frame)?;
        shared.replays.lock().insert(id, subscription.id());
        socket.sink.send(text).await?;
        trace!(id = %subscription.id(), topic = %subscription.topic(), "resubscribe sent");
    }
    Ok(subscriptions.len())
}
