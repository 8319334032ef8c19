//! Routes inbound data frames to the subscribers registered for their topic.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use super::client::{DispatchMode, EventNotifier};
use super::models::{WebSocketEvent, WsMessage};
use super::registry::TopicRegistry;

static NULL_PAYLOAD: Value = Value::Null;

/// Delivers one frame to every matching subscription, isolating failures.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    registry: Arc<TopicRegistry>,
    events: EventNotifier,
}

impl Dispatcher {
    pub(crate) fn new(registry: Arc<TopicRegistry>, events: EventNotifier) -> Self {
        Self { registry, events }
    }

    /// Returns the number of subscribers that accepted the frame.
    pub(crate) fn dispatch(&self, msg: &WsMessage) -> usize {
        let topic = msg.topic();
        let matched = self.registry.lookup(topic);
        if matched.is_empty() {
            debug!(topic, "no subscription for frame");
            return 0;
        }

        let subject = msg.subject();
        let payload = msg.data.as_ref().unwrap_or(&NULL_PAYLOAD);
        let mut delivered = 0;

        for subscription in matched {
            let id = subscription.id();
            trace!(%id, topic, subject, "dispatching frame");
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                subscription.subscriber().on_event(topic, subject, payload)
            }));
            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    warn!(%id, topic, error = %err, "subscriber failed");
                    self.events
                        .notify(WebSocketEvent::CallbackError, &format!("{id} {topic}: {err}"));
                }
                Err(panic) => {
                    let reason = panic_reason(panic.as_ref());
                    error!(%id, topic, %reason, "subscriber panicked");
                    self.events.notify(
                        WebSocketEvent::CallbackError,
                        &format!("{id} {topic}: panic: {reason}"),
                    );
                }
            }
        }
        delivered
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Where the receive task sends data frames.
pub(crate) enum DispatchHandle {
    Inline(Dispatcher),
    Queued {
        queue: mpsc::Sender<WsMessage>,
        task: JoinHandle<()>,
    },
}

impl DispatchHandle {
    /// Must be called from within a tokio runtime when `mode` is queued.
    pub(crate) fn new(dispatcher: Dispatcher, mode: DispatchMode) -> Self {
        match mode {
            DispatchMode::Inline => DispatchHandle::Inline(dispatcher),
            DispatchMode::Queued { capacity } => {
                let (queue, mut rx) = mpsc::channel::<WsMessage>(capacity.max(1));
                let task = tokio::spawn(async move {
                    while let Some(msg) = rx.recv().await {
                        dispatcher.dispatch(&msg);
                    }
                    debug!("dispatch queue drained");
                });
                DispatchHandle::Queued { queue, task }
            }
        }
    }

    pub(crate) async fn dispatch(&self, msg: WsMessage) {
        match self {
            DispatchHandle::Inline(dispatcher) => {
                dispatcher.dispatch(&msg);
            }
            DispatchHandle::Queued { queue, .. } => {
                if queue.send(msg).await.is_err() {
                    warn!("dispatch task is gone, dropping frame");
                }
            }
        }
    }

    /// Deliver whatever is still queued, then stop the dispatch task.
    pub(crate) async fn finish(self) {
        if let DispatchHandle::Queued { queue, task } = self {
            drop(queue);
            if let Err(e) = task.await {
                warn!(error = %e, "dispatch task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::subscriber::{CallbackResult, FnSubscriber, Subscriber};
    use crate::ws::topics::{Topic, prefix};
    use serde_json::json;
    use std::sync::Mutex;

    fn frame(topic: &str, data: Value) -> WsMessage {
        serde_json::from_value(json!({
            "type": "message",
            "topic": topic,
            "subject": "trade.ticker",
            "data": data,
        }))
        .unwrap()
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &str) -> Arc<dyn Subscriber> {
        let log = log.clone();
        let name = name.to_string();
        Arc::new(FnSubscriber::new(
            move |_: &str, _: &str, payload: &Value| -> CallbackResult {
                log.lock().unwrap().push(format!("{name}:{}", payload["price"]));
                Ok(())
            },
        ))
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = Arc::new(TopicRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let topic = Topic::with_symbol(prefix::SPOT_TICKER, "BTC-USDT").unwrap();
        registry.register(topic.clone(), recorder(&log, "a")).unwrap();
        registry.register(topic, recorder(&log, "b")).unwrap();

        let dispatcher = Dispatcher::new(registry, EventNotifier::default());
        let delivered = dispatcher.dispatch(&frame("/market/ticker:BTC-USDT", json!({"price": 1})));

        assert_eq!(delivered, 2);
        assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1"]);
    }

    #[test]
    fn test_unmatched_frame_is_dropped() {
        let registry = Arc::new(TopicRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register(
                Topic::with_symbol(prefix::SPOT_TICKER, "BTC-USDT").unwrap(),
                recorder(&log, "a"),
            )
            .unwrap();

        let dispatcher = Dispatcher::new(registry, EventNotifier::default());
        assert_eq!(dispatcher.dispatch(&frame("/market/ticker:ETH-USDT", json!({}))), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failing_subscribers_do_not_block_others() {
        let registry = Arc::new(TopicRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let topic = Topic::with_symbol(prefix::SPOT_TICKER, "BTC-USDT").unwrap();

        registry
            .register(
                topic.clone(),
                Arc::new(FnSubscriber::new(
                    |_: &str, _: &str, _: &Value| -> CallbackResult { panic!("callback bug") },
                )),
            )
            .unwrap();
        registry
            .register(
                topic.clone(),
                Arc::new(FnSubscriber::new(
                    |_: &str, _: &str, _: &Value| -> CallbackResult { Err("rejected".into()) },
                )),
            )
            .unwrap();
        registry.register(topic, recorder(&log, "ok")).unwrap();

        let seen = events.clone();
        let notifier = EventNotifier::new(Some(Arc::new(move |event: WebSocketEvent, detail: &str| {
            seen.lock().unwrap().push((event, detail.to_string()));
        })));
        let dispatcher = Dispatcher::new(registry, notifier);

        let delivered = dispatcher.dispatch(&frame("/market/ticker:BTC-USDT", json!({"price": 7})));

        assert_eq!(delivered, 1);
        assert_eq!(*log.lock().unwrap(), vec!["ok:7"]);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|(e, _)| *e == WebSocketEvent::CallbackError));
        assert!(events[0].1.contains("callback bug"));
        assert!(events[1].1.contains("rejected"));
    }

    #[tokio::test]
    async fn test_queued_dispatch_preserves_order() {
        let registry = Arc::new(TopicRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register(
                Topic::with_symbol(prefix::SPOT_TRADE, "BTC-USDT").unwrap(),
                recorder(&log, "t"),
            )
            .unwrap();

        let handle = DispatchHandle::new(
            Dispatcher::new(registry, EventNotifier::default()),
            DispatchMode::Queued { capacity: 2 },
        );
        for price in 0..10 {
            handle
                .dispatch(frame("/market/match:BTC-USDT", json!({"price": price})))
                .await;
        }
        handle.finish().await;

        let expected: Vec<String> = (0..10).map(|p| format!("t:{p}")).collect();
        assert_eq!(*log.lock().unwrap(), expected);
    }
}
