//! Lifecycle and subscription management on top of a [`Connection`].

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::{Connector, EventNotifier, WebsocketConfig};
use super::models::{WebSocketEvent, WsMessage};
use super::registry::{SubscriptionId, TopicRegistry};
use super::subscriber::{CallbackResult, Subscriber, TypedSubscriber};
use super::token::WsTokenProvider;
use super::topics::Topic;
use super::transport::{Connection, ConnectionParams, ConnectionState};
use crate::SDKResult;
use crate::errors::WSErrors;

/// Lifecycle of a [`WsService`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Running,
    Stopped,
}

struct Lifecycle {
    state: ServiceState,
    connection: Option<Arc<Connection>>,
}

/// A WebSocket client for one channel family (public or private) of one
/// domain.
///
/// # Example
///
/// ```no_run
/// use kucoin_rust_sdk::KucoinClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = KucoinClient::global()?;
/// let ws = client.new_spot_public_ws();
/// ws.start().await?;
///
/// let id = ws
///     .ticker(["BTC-USDT"], |_topic, _subject, ticker| {
///         println!("best ask {:?}", ticker.best_ask);
///         Ok(())
///     })
///     .await?;
///
/// ws.unsubscribe(id).await?;
/// ws.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct WsService {
    config: WebsocketConfig,
    private: bool,
    tokens: Arc<dyn WsTokenProvider>,
    connector: Arc<dyn Connector>,
    registry: Arc<TopicRegistry>,
    events: EventNotifier,
    lifecycle: Mutex<Lifecycle>,
}

impl WsService {
    pub fn new(
        config: WebsocketConfig,
        private: bool,
        tokens: Arc<dyn WsTokenProvider>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            events: EventNotifier::new(config.event_callback.clone()),
            config,
            private,
            tokens,
            connector,
            registry: Arc::new(TopicRegistry::new()),
            lifecycle: Mutex::new(Lifecycle {
                state: ServiceState::Uninitialized,
                connection: None,
            }),
        }
    }

    /// Open the connection. Fails with [`WSErrors::AlreadyStarted`] when the
    /// service is running; a stopped service may be started again.
    pub async fn start(&self) -> SDKResult<(), WSErrors> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state == ServiceState::Running {
            return Err(WSErrors::AlreadyStarted);
        }

        let connection = Connection::open(ConnectionParams {
            config: self.config.clone(),
            private: self.private,
            tokens: self.tokens.clone(),
            connector: self.connector.clone(),
            registry: self.registry.clone(),
        })
        .await?;

        lifecycle.connection = Some(Arc::new(connection));
        lifecycle.state = ServiceState::Running;
        info!(private = self.private, "websocket service started");
        Ok(())
    }

    /// Close the connection and drop every subscription. Safe to call at any
    /// time; a second call does nothing.
    pub async fn stop(&self) -> SDKResult<(), WSErrors> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != ServiceState::Running {
            debug!(state = ?lifecycle.state, "stop on a service that is not running");
            return Ok(());
        }

        if let Some(connection) = lifecycle.connection.take() {
            connection.close().await;
        }
        let dropped = self.registry.clear();
        lifecycle.state = ServiceState::Stopped;

        info!(dropped = dropped.len(), "websocket service stopped");
        self.events.notify(WebSocketEvent::ClientShutdown, "");
        Ok(())
    }

    pub async fn state(&self) -> ServiceState {
        self.lifecycle.lock().await.state
    }

    /// State of the underlying connection, if one was opened.
    pub async fn connection_state(&self) -> Option<ConnectionState> {
        let lifecycle = self.lifecycle.lock().await;
        lifecycle.connection.as_ref().map(|c| c.state())
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Register `subscriber` for `topic` and wait for the server's ack.
    ///
    /// On any failure the registration is rolled back and the error returned;
    /// on success frames for the topic reach the subscriber until it is
    /// unsubscribed.
    pub async fn subscribe(
        &self,
        topic: Topic,
        subscriber: Arc<dyn Subscriber>,
    ) -> SDKResult<SubscriptionId, WSErrors> {
        let connection = self.active_connection().await?;
        let id = self.registry.register(topic.clone(), subscriber)?;

        let frame = WsMessage::subscribe(
            connection.next_message_id(),
            topic.to_string(),
            self.private,
        );
        match connection.write(frame, self.config.write_timeout).await {
            Ok(()) => {
                info!(%id, %topic, private = self.private, "subscribed");
                Ok(id)
            }
            Err(e) => {
                self.registry.unregister(id);
                warn!(%topic, error = %e, "subscribe failed");
                Err(e)
            }
        }
    }

    /// Like [`subscribe`](Self::subscribe), decoding every payload into `E`.
    pub async fn subscribe_typed<E, F>(
        &self,
        topic: Topic,
        callback: F,
    ) -> SDKResult<SubscriptionId, WSErrors>
    where
        E: DeserializeOwned + 'static,
        F: Fn(&str, &str, E) -> CallbackResult + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(TypedSubscriber::new(callback)))
            .await
    }

    /// Remove a subscription. Returns `Ok(false)` when `id` is unknown, e.g.
    /// on a second call with the same id.
    ///
    /// An unsubscribe frame is sent only for the part of the topic no other
    /// subscription still needs, and only while the socket is connected.
    /// Removal is local: a frame that is rejected or never acknowledged is
    /// logged and reported as an `ErrorReceived` event, and the call still
    /// returns `Ok(true)`.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> SDKResult<bool, WSErrors> {
        let Some(removed) = self.registry.unregister(id) else {
            debug!(%id, "unsubscribe of unknown subscription");
            return Ok(false);
        };
        let topic = removed.subscription.topic();
        info!(%id, %topic, "unsubscribed");

        let Some(orphaned) = removed.orphaned else {
            return Ok(true);
        };

        let connection = {
            let lifecycle = self.lifecycle.lock().await;
            lifecycle.connection.clone()
        };
        match connection {
            Some(connection) if connection.state() == ConnectionState::Connected => {
                let frame = WsMessage::unsubscribe(
                    connection.next_message_id(),
                    orphaned.to_string(),
                    self.private,
                );
                if let Err(e) = connection.write(frame, self.config.write_timeout).await {
                    warn!(%id, topic = %orphaned, error = %e, "unsubscribe frame failed");
                    self.events.notify(
                        WebSocketEvent::ErrorReceived,
                        &format!("unsubscribe {orphaned}: {e}"),
                    );
                }
            }
            _ => debug!(topic = %orphaned, "not connected, skipping unsubscribe frame"),
        }
        Ok(true)
    }

    async fn active_connection(&self) -> SDKResult<Arc<Connection>, WSErrors> {
        let lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != ServiceState::Running {
            return Err(WSErrors::NotConnected);
        }
        match &lifecycle.connection {
            Some(connection) if connection.state() != ConnectionState::Closed => {
                Ok(connection.clone())
            }
            _ => Err(WSErrors::NotConnected),
        }
    }
}

impl fmt::Debug for WsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsService")
            .field("private", &self.private)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}
