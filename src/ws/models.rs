//! WebSocket wire models.
//!
//! Every frame exchanged with the server, in either direction, shares one
//! envelope shape: `{"id", "type", "sn", "topic", "subject", "privateChannel",
//! "response", "data"}`. Absent fields are omitted when serializing so that
//! control frames carry exactly the fields the server expects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` field of a frame.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Welcome,
    Ping,
    Pong,
    Subscribe,
    Unsubscribe,
    Ack,
    Error,
    Message,
    Notice,
    Command,
    /// Any type this SDK does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single WebSocket frame.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WsMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    /// Sequence number, present on some data frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_channel: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WsMessage {
    /// Build a subscribe control frame that asks the server for an ack.
    pub fn subscribe(id: impl Into<String>, topic: impl Into<String>, private: bool) -> Self {
        Self::control(MessageType::Subscribe, id, topic, private)
    }

    /// Build an unsubscribe control frame that asks the server for an ack.
    pub fn unsubscribe(id: impl Into<String>, topic: impl Into<String>, private: bool) -> Self {
        Self::control(MessageType::Unsubscribe, id, topic, private)
    }

    /// Build a keepalive ping.
    pub fn ping(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            kind: MessageType::Ping,
            ..Default::default()
        }
    }

    fn control(
        kind: MessageType,
        id: impl Into<String>,
        topic: impl Into<String>,
        private: bool,
    ) -> Self {
        Self {
            id: Some(id.into()),
            kind,
            topic: Some(topic.into()),
            private_channel: Some(private),
            response: Some(true),
            ..Default::default()
        }
    }

    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or_default()
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or_default()
    }

    /// Returns true if this frame answers a control frame with an error.
    pub fn is_error(&self) -> bool {
        self.kind == MessageType::Error
    }

    /// Human readable error detail carried by an `error` frame.
    pub fn error_message(&self) -> String {
        match &self.data {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        }
    }
}

/// Token and endpoint used to open one socket.
///
/// Produced by a [`WsTokenProvider`](super::token::WsTokenProvider), one per
/// advertised instance server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WsToken {
    pub token: String,
    /// WebSocket endpoint, e.g. `wss://ws-api-spot.kucoin.com/`.
    pub endpoint: String,
    pub encrypt: bool,
    pub protocol: String,
    /// Recommended ping interval in milliseconds.
    pub ping_interval: u64,
    /// Heartbeat timeout in milliseconds.
    pub ping_timeout: u64,
}

/// Lifecycle notifications delivered to the configured event callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WebSocketEvent {
    /// Connection established (initially or after a reconnect).
    Connected,
    /// Connection closed by the server, the network, or the client.
    Disconnected,
    /// About to attempt a reconnect; the message carries the attempt number.
    TryReconnect,
    /// I/O or protocol error that did not end the connection.
    ErrorReceived,
    /// A subscriber failed, returned an error, or panicked.
    CallbackError,
    /// A subscription was replayed successfully after a reconnect.
    ReSubscribeOk,
    /// A subscription could not be replayed after a reconnect. It has been
    /// removed; subscribe again to retry.
    ReSubscribeError,
    /// A subscription was dropped because the connection closed for good.
    SubscriptionClosed,
    /// Fatal failure; the connection is closed and will not recover.
    ClientFail,
    /// The client was stopped by the caller.
    ClientShutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_wire_format() {
        let msg = WsMessage::subscribe("1", "/market/ticker:BTC-USDT,ETH-USDT", false);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"id":"1","type":"subscribe","topic":"/market/ticker:BTC-USDT,ETH-USDT","privateChannel":false,"response":true}"#
        );
    }

    #[test]
    fn test_unsubscribe_private_frame() {
        let msg = WsMessage::unsubscribe("9", "/spotMarket/tradeOrdersV2", true);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "unsubscribe");
        assert_eq!(value["privateChannel"], true);
        assert_eq!(value["response"], true);
    }

    #[test]
    fn test_ping_frame() {
        let json = serde_json::to_string(&WsMessage::ping("1700000000000")).unwrap();
        assert_eq!(json, r#"{"id":"1700000000000","type":"ping"}"#);
    }

    #[test]
    fn test_welcome_message() {
        let json = r#"{"id":"hQvf8jkno","type":"welcome"}"#;
        let msg: WsMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, MessageType::Welcome);
        assert_eq!(msg.id.as_deref(), Some("hQvf8jkno"));
    }

    #[test]
    fn test_data_message() {
        let json = r#"{
            "type": "message",
            "topic": "/market/ticker:BTC-USDT",
            "subject": "trade.ticker",
            "data": {"bestAsk": "100", "bestBid": "99"}
        }"#;

        let msg: WsMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, MessageType::Message);
        assert_eq!(msg.topic(), "/market/ticker:BTC-USDT");
        assert_eq!(msg.subject(), "trade.ticker");
        assert_eq!(msg.data.unwrap()["bestAsk"], "100");
    }

    #[test]
    fn test_error_message() {
        let json = r#"{"id":"3","type":"error","code":404,"data":"topic /market/foo is not found"}"#;
        let msg: WsMessage = serde_json::from_str(json).unwrap();
        assert!(msg.is_error());
        assert_eq!(msg.error_message(), "topic /market/foo is not found");
    }

    #[test]
    fn test_unknown_type() {
        let json = r#"{"type":"somethingNew"}"#;
        let msg: WsMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, MessageType::Unknown);
    }
}
