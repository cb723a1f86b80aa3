//! Observability event bus.
//!
//! Producers (the request-recording middleware and the realtime hub) never
//! block: delivery goes through bounded per-subscriber channels and events
//! are dropped for subscribers that lag. Dropped subscribers are pruned on
//! the next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::trace;

use textlens_models::RequestLogEntry;

/// Buffered events per subscriber before drops start.
const EVENT_BUFFER: usize = 64;

/// Events fanned out by the lifecycle manager's registries.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// One HTTP exchange completed and was recorded.
    RequestLogged(RequestLogEntry),
    /// The realtime connection count changed.
    ConnectionCount(usize),
}

/// Cancellation handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    subscribers: HashMap<u64, mpsc::Sender<ServerEvent>>,
}

/// Cloneable handle to the shared subscriber registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer; drop the receiver or call
    /// [`EventBus::unsubscribe`] to cancel.
    pub fn subscribe(&self) -> (SubscriptionId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .subscribers
            .insert(id, tx);
        (SubscriptionId(id), rx)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .subscribers
            .remove(&id.0);
    }

    /// Fan an event out to every live subscriber without blocking.
    pub fn publish(&self, event: ServerEvent) {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        registry.subscribers.retain(|id, tx| {
            match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    trace!(subscriber = id, "subscriber lagging, event dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .subscribers
            .len()
    }
}
