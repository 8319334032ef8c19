//! Callback contract between the dispatcher and user code.

use std::error::Error;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::WSErrors;

/// Error a subscriber may hand back to the dispatcher.
pub type CallbackError = Box<dyn Error + Send + Sync>;
/// Outcome of a single callback invocation.
pub type CallbackResult = Result<(), CallbackError>;

/// Receives the payloads of one subscription.
///
/// Called from the connection's dispatch task, never concurrently for the
/// same connection. An `Err` or a panic is logged and reported as a
/// `CallbackError` event; it never stops delivery to other subscribers.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, topic: &str, subject: &str, payload: &Value) -> CallbackResult;
}

/// Subscriber over the raw JSON payload.
pub struct FnSubscriber<F>(F);

impl<F> FnSubscriber<F>
where
    F: Fn(&str, &str, &Value) -> CallbackResult + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&str, &str, &Value) -> CallbackResult + Send + Sync,
{
    fn on_event(&self, topic: &str, subject: &str, payload: &Value) -> CallbackResult {
        (self.0)(topic, subject, payload)
    }
}

/// Subscriber that decodes each payload into `E` before calling back.
///
/// A payload that does not decode is reported as
/// [`WSErrors::DeserializationError`] and the callback is skipped.
pub struct TypedSubscriber<E, F> {
    callback: F,
    _event: PhantomData<fn() -> E>,
}

impl<E, F> TypedSubscriber<E, F>
where
    E: DeserializeOwned,
    F: Fn(&str, &str, E) -> CallbackResult + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _event: PhantomData,
        }
    }
}

impl<E, F> Subscriber for TypedSubscriber<E, F>
where
    E: DeserializeOwned,
    F: Fn(&str, &str, E) -> CallbackResult + Send + Sync,
{
    fn on_event(&self, topic: &str, subject: &str, payload: &Value) -> CallbackResult {
        let event = E::deserialize(payload).map_err(|source| WSErrors::DeserializationError {
            topic: topic.to_string(),
            source,
        })?;
        (self.callback)(topic, subject, event)
    }
}

impl<E, F> fmt::Debug for TypedSubscriber<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSubscriber")
            .field("event", &std::any::type_name::<E>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Quote {
        best_ask: String,
    }

    #[test]
    fn test_typed_subscriber_decodes() {
        let seen = Mutex::new(Vec::new());
        let sub = TypedSubscriber::new(|topic: &str, _: &str, quote: Quote| {
            seen.lock().unwrap().push((topic.to_string(), quote.best_ask));
            Ok(())
        });

        sub.on_event("/market/ticker:BTC-USDT", "trade.ticker", &json!({"bestAsk": "100"}))
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("/market/ticker:BTC-USDT".to_string(), "100".to_string())]
        );
    }

    #[test]
    fn test_typed_subscriber_reports_bad_payload() {
        let sub = TypedSubscriber::new(|_: &str, _: &str, _: Quote| Ok(()));
        let err = sub
            .on_event("/market/ticker:BTC-USDT", "trade.ticker", &json!({"bestAsk": 1}))
            .unwrap_err();

        let err = err.downcast::<WSErrors>().unwrap();
        assert!(matches!(*err, WSErrors::DeserializationError { ref topic, .. } if topic == "/market/ticker:BTC-USDT"));
    }

    #[test]
    fn test_fn_subscriber_passes_raw_payload() {
        let sub = FnSubscriber::new(|_: &str, subject: &str, payload: &Value| {
            assert_eq!(subject, "trade.l2update");
            assert_eq!(payload["sequenceStart"], 1);
            Ok(())
        });
        sub.on_event("/market/level2:BTC-USDT", "trade.l2update", &json!({"sequenceStart": 1}))
            .unwrap();
    }
}
