//! Error types for the KuCoin SDK.

use thiserror::Error;

/// Errors that can occur when using the SDK outside of a live socket.
#[derive(Error, Debug)]
pub enum SDKError {
    /// JSON serialization error.
    #[error(transparent)]
    JsonSerializeError(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The exchange answered with a non-success result code.
    #[error("API error (code {code}): {message}")]
    ApiError { code: String, message: String },

    #[error("Provided URL is not a valid REST endpoint: {0}")]
    InvalidNetworkUrl(String),

    /// A private channel was requested without a token provider for its domain.
    #[error("No private token provider configured for the {0} domain")]
    MissingPrivateTokenProvider(&'static str),

    #[error(transparent)]
    WebsocketError(#[from] Box<WSErrors>),
}

impl From<WSErrors> for SDKError {
    fn from(err: WSErrors) -> Self {
        SDKError::WebsocketError(Box::new(err))
    }
}

/// Coarse classification of [`WSErrors`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket-level failure, handshake timeout or a closed connection.
    Connection,
    /// Invalid lifecycle transition.
    State,
    /// Invalid arguments to a subscription call.
    Subscription,
    /// Payload did not match the expected event type.
    Deserialization,
    /// The exchange rejected a control frame.
    Server,
}

#[derive(Debug, Error)]
pub enum WSErrors {
    /// WebSocket connection error.
    #[error("WebSocket connection error: {0}")]
    WsConnectionError(String),

    /// WebSocket upgrade error.
    #[error(transparent)]
    WsUpgradeError(#[from] reqwest_websocket::Error),

    /// WebSocket connection was closed by the server.
    #[error("WebSocket closed ({code}): {reason}")]
    WsClosed {
        /// Close code from the server
        code: reqwest_websocket::CloseCode,
        /// Close reason from the server
        reason: String,
    },

    /// WebSocket stream ended unexpectedly without a close frame.
    #[error("WebSocket stream ended unexpectedly")]
    WsStreamEnded,

    /// WebSocket connection handshake timed out.
    #[error("WebSocket connection timed out waiting for welcome")]
    WsConnectionTimeout,

    /// WebSocket server did not send the expected welcome message.
    #[error("Expected 'welcome' message, got: {0}")]
    WsHandshakeFailed(String),

    /// The token provider could not supply a usable token.
    #[error("WebSocket token unavailable: {0}")]
    WsTokenError(String),

    /// A frame was written while the socket was not connected.
    #[error("WebSocket is not connected")]
    NotConnected,

    /// The server did not acknowledge a control frame in time.
    #[error("Timed out waiting for ack of message {0}")]
    AckTimeout(String),

    /// Reconnection gave up after the configured number of attempts.
    #[error("Reconnect failed after {0} attempts")]
    ReconnectExhausted(u32),

    /// `start` was called on a running service.
    #[error("WebSocket service is already started")]
    AlreadyStarted,

    /// A subscription was requested without any symbols.
    #[error("Subscription to {0} requires at least one symbol")]
    EmptySymbols(String),

    /// A subscription argument was rejected before reaching the wire.
    #[error("Invalid subscription argument: {0}")]
    InvalidArgument(String),

    /// Payload could not be decoded into the registered event type.
    #[error("Failed to decode payload for {topic}: {source}")]
    DeserializationError {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// WebSocket server returned an error.
    #[error("WebSocket server error: {message}")]
    WsServerError { message: String },

    /// JSON serialization error.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

impl WSErrors {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WSErrors::AlreadyStarted => ErrorKind::State,
            WSErrors::EmptySymbols(_) | WSErrors::InvalidArgument(_) => ErrorKind::Subscription,
            WSErrors::DeserializationError { .. } | WSErrors::JsonError(_) => {
                ErrorKind::Deserialization
            }
            WSErrors::WsServerError { .. } => ErrorKind::Server,
            _ => ErrorKind::Connection,
        }
    }
}

pub type SDKResult<T, E = SDKError> = Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(WSErrors::NotConnected.kind(), ErrorKind::Connection);
        assert_eq!(WSErrors::WsStreamEnded.kind(), ErrorKind::Connection);
        assert_eq!(WSErrors::ReconnectExhausted(3).kind(), ErrorKind::Connection);
        assert_eq!(WSErrors::AlreadyStarted.kind(), ErrorKind::State);
        assert_eq!(
            WSErrors::EmptySymbols("/market/ticker".into()).kind(),
            ErrorKind::Subscription
        );
        assert_eq!(
            WSErrors::WsServerError {
                message: "topic not found".into()
            }
            .kind(),
            ErrorKind::Server
        );
    }

    #[test]
    fn test_ws_error_into_sdk_error() {
        let err: SDKError = WSErrors::AckTimeout("42".into()).into();
        assert!(matches!(err, SDKError::WebsocketError(_)));
        assert_eq!(err.to_string(), "Timed out waiting for ack of message 42");
    }
}
