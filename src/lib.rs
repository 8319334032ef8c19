//! Rust SDK for KuCoin WebSocket market data and account streams.
//!
//! Build a [`KucoinClient`], ask it for the service of a market domain and
//! start it; every typed subscription method then returns a
//! [`SubscriptionId`](ws::SubscriptionId) usable with `unsubscribe`.

mod client;
mod de;

/// Error types for the SDK.
pub mod errors;
pub mod rest;

// Re-export main types at crate root for ergonomic imports
pub use client::{ClientOption, GLOBAL_API_ENDPOINT, GLOBAL_FUTURES_API_ENDPOINT, KucoinClient};
pub use errors::{ErrorKind, SDKError, SDKResult, WSErrors};
// Re-export WebSocket close code for pattern matching
pub use reqwest_websocket::CloseCode;

// Re-export WebSocket module and types
pub mod ws;
pub use ws::{
    CallbackResult, DispatchMode, KlineInterval, ServiceState, SubscriptionId, Topic,
    WebSocketEvent, WebsocketConfig, WsService,
};

// Typed channel façades per market domain
pub mod futures;
pub mod margin;
pub mod spot;
