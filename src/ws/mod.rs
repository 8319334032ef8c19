//! WebSocket subscription engine.
//!
//! # Architecture
//!
//! - [`token`]: fetches the short-lived token and server list for a socket.
//! - [`client`]: configuration and the [`Connector`] that opens sockets.
//! - [`transport`]: one connection with keepalive, acks and reconnect.
//! - [`registry`]: the live subscriptions and their topics.
//! - `dispatcher`: routes data frames to subscribers.
//! - [`service`]: start/stop lifecycle and subscribe/unsubscribe.
//!
//! Domain façades (`spot`, `futures`, `margin`) wrap a [`WsService`] and
//! expose one typed method per channel.

pub mod client;
mod dispatcher;
pub mod models;
pub mod registry;
pub mod service;
pub mod subscriber;
pub mod token;
pub mod topics;
pub mod transport;

// Re-export commonly used types at ws module level
pub use client::{Connector, DispatchMode, EventCallback, ReqwestConnector, Socket, WebsocketConfig};
pub use models::{MessageType, WebSocketEvent, WsMessage, WsToken};
pub use registry::{Subscription, SubscriptionId, TopicRegistry};
pub use service::{ServiceState, WsService};
pub use subscriber::{CallbackError, CallbackResult, FnSubscriber, Subscriber, TypedSubscriber};
pub use token::{RestTokenProvider, StaticTokenProvider, WsTokenProvider};
pub use topics::{KlineInterval, Topic};
pub use transport::ConnectionState;
