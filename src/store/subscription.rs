//! Live query subscriptions.
//!
//! Every committed mutation re-evaluates every registered query and
//! re-delivers the full result set; there is no differential diffing.
//! Delivery order across subscribers is unspecified.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::query::Query;
use super::snapshot::QuerySnapshot;

type Callback = Box<dyn Fn(&QuerySnapshot) + Send + Sync>;

pub(crate) struct Listener {
    query: Query,
    callback: Callback,
}

impl Listener {
    pub(crate) fn query(&self) -> &Query {
        &self.query
    }

    pub(crate) fn invoke(&self, snapshot: &QuerySnapshot) {
        (self.callback)(snapshot);
    }
}

pub(crate) struct ListenerRegistry {
    listeners: RwLock<HashMap<u64, Arc<Listener>>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        ListenerRegistry {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn register(self: &Arc<Self>, query: Query, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.insert(id, Arc::new(Listener { query, callback }));
        }
        Subscription {
            id,
            registry: Arc::clone(self),
        }
    }

    pub(crate) fn get(&self, id: u64) -> Option<Arc<Listener>> {
        self.listeners.read().ok()?.get(&id).cloned()
    }

    /// Snapshot the active listeners so delivery runs without the registry
    /// lock held; a callback may subscribe or unsubscribe re-entrantly.
    pub(crate) fn active(&self) -> Vec<Arc<Listener>> {
        self.listeners
            .read()
            .map(|l| l.values().cloned().collect())
            .unwrap_or_default()
    }

    fn remove(&self, id: u64) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.remove(&id);
        }
    }
}

/// Handle returned by [`Database::subscribe`](super::Database::subscribe).
///
/// Dropping the handle does NOT stop delivery; the listener stays
/// registered until [`unsubscribe`](Subscription::unsubscribe) is called.
pub struct Subscription {
    id: u64,
    registry: Arc<ListenerRegistry>,
}

impl Subscription {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Stop future deliveries to this callback. Idempotent.
    pub fn unsubscribe(&self) {
        self.registry.remove(self.id);
    }
}
