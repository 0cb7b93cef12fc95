//! The shared current-route slot

use std::sync::Arc;

use parking_lot::RwLock;

use waypoint_history::{ListenerSet, Subscription};
use waypoint_routes::MatchedRoute;

pub type ChangeListener = dyn Fn(&Arc<MatchedRoute>) + Send + Sync;

/// Holds the last committed route.
///
/// Only the router writes to it; rendering layers read and subscribe.
pub trait RouteCell: Send + Sync {
    fn get(&self) -> Arc<MatchedRoute>;

    /// Store `route` and notify subscribers.
    fn set(&self, route: Arc<MatchedRoute>);

    fn subscribe(&self, listener: Arc<ChangeListener>) -> Subscription;
}

/// Default [`RouteCell`]: a lock-protected value plus a listener list.
pub struct SignalCell {
    value: Arc<RwLock<Arc<MatchedRoute>>>,
    listeners: ListenerSet<ChangeListener>,
}

impl SignalCell {
    pub fn new(initial: Arc<MatchedRoute>) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
            listeners: ListenerSet::new(),
        }
    }
}

impl Default for SignalCell {
    fn default() -> Self {
        Self::new(Arc::new(MatchedRoute::start()))
    }
}

impl Clone for SignalCell {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            listeners: self.listeners.clone(),
        }
    }
}

impl RouteCell for SignalCell {
    fn get(&self) -> Arc<MatchedRoute> {
        Arc::clone(&self.value.read())
    }

    fn set(&self, route: Arc<MatchedRoute>) {
        *self.value.write() = Arc::clone(&route);
        for listener in self.listeners.snapshot() {
            listener(&route);
        }
    }

    fn subscribe(&self, listener: Arc<ChangeListener>) -> Subscription {
        self.listeners.add(listener)
    }
}
