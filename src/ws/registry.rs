//! Topic registry: the set of live subscriptions of one connection.
//!
//! Subscriptions are indexed by topic prefix so that routing an inbound frame
//! only looks at the subscriptions that can possibly match it. Ids are
//! allocated monotonically, which makes id order equal to registration order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::subscriber::Subscriber;
use super::topics::Topic;
use crate::errors::WSErrors;

/// Opaque handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One registered subscription.
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    subscriber: Arc<dyn Subscriber>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn subscriber(&self) -> &dyn Subscriber {
        self.subscriber.as_ref()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic.to_string())
            .finish()
    }
}

/// Result of removing a subscription.
#[derive(Debug)]
pub struct Removed {
    pub subscription: Arc<Subscription>,
    /// The part of the removed topic no other subscription still needs.
    /// `None` when every argument is still held elsewhere.
    pub orphaned: Option<Topic>,
}

#[derive(Default)]
struct Inner {
    last_id: u64,
    by_prefix: HashMap<String, BTreeMap<SubscriptionId, Arc<Subscription>>>,
    prefixes: HashMap<SubscriptionId, String>,
}

/// Thread-safe map of live subscriptions.
#[derive(Default)]
pub struct TopicRegistry {
    inner: Mutex<Inner>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription and return its fresh id.
    ///
    /// Identical topics may be registered more than once; every registration
    /// receives its own copy of each matching frame.
    pub fn register(
        &self,
        topic: Topic,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<SubscriptionId, WSErrors> {
        if topic.prefix().is_empty() {
            return Err(WSErrors::InvalidArgument("empty topic prefix".to_string()));
        }

        let mut inner = self.inner.lock();
        inner.last_id += 1;
        let id = SubscriptionId(inner.last_id);
        let prefix = topic.prefix().to_string();
        let subscription = Arc::new(Subscription {
            id,
            topic,
            subscriber,
        });
        inner
            .by_prefix
            .entry(prefix.clone())
            .or_default()
            .insert(id, subscription);
        inner.prefixes.insert(id, prefix);
        Ok(id)
    }

    /// Remove a subscription. Returns `None` for an unknown id, so a second
    /// call with the same id is harmless.
    pub fn unregister(&self, id: SubscriptionId) -> Option<Removed> {
        let mut inner = self.inner.lock();
        let prefix = inner.prefixes.remove(&id)?;
        let siblings = inner.by_prefix.get_mut(&prefix)?;
        let subscription = siblings.remove(&id)?;

        let orphaned = if subscription.topic.args().is_empty() {
            let still_held = siblings.values().any(|s| s.topic.args().is_empty());
            (!still_held).then(|| subscription.topic.clone())
        } else {
            let orphaned_args: Vec<String> = subscription
                .topic
                .args()
                .iter()
                .filter(|arg| !siblings.values().any(|s| s.topic.args().contains(arg)))
                .cloned()
                .collect();
            (!orphaned_args.is_empty()).then(|| subscription.topic.narrowed(orphaned_args))
        };

        if siblings.is_empty() {
            inner.by_prefix.remove(&prefix);
        }

        Some(Removed {
            subscription,
            orphaned,
        })
    }

    /// Subscriptions matching an inbound frame topic, in registration order.
    pub fn lookup(&self, raw_topic: &str) -> Vec<Arc<Subscription>> {
        let (prefix, _) = Topic::split(raw_topic);
        let inner = self.inner.lock();
        let Some(candidates) = inner.by_prefix.get(prefix) else {
            return Vec::new();
        };
        candidates
            .values()
            .filter(|s| s.topic.matches(raw_topic))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        let inner = self.inner.lock();
        let prefix = inner.prefixes.get(&id)?;
        inner.by_prefix.get(prefix)?.get(&id).cloned()
    }

    /// Every live subscription, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Subscription>> {
        let inner = self.inner.lock();
        Self::ordered(&inner)
    }

    /// Drop every subscription and return what was dropped, in registration order.
    pub fn clear(&self) -> Vec<Arc<Subscription>> {
        let mut inner = self.inner.lock();
        let drained = Self::ordered(&inner);
        inner.by_prefix.clear();
        inner.prefixes.clear();
        drained
    }

    pub fn len(&self) -> usize {
        self.inner.lock().prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ordered(inner: &Inner) -> Vec<Arc<Subscription>> {
        let mut all: Vec<Arc<Subscription>> = inner
            .by_prefix
            .values()
            .flat_map(|subs| subs.values().cloned())
            .collect();
        all.sort_by_key(|s| s.id);
        all
    }
}

impl fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicRegistry")
            .field("subscriptions", &self.len())
            .finish()
    }
}
