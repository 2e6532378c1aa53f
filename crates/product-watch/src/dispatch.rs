//! Forwarding accepted changes to the coordinator and the durable store.
//!
//! The [`CoordinatorBus`] is a `tokio::sync::broadcast` channel carrying
//! [`CoordinatorMessage`] values. Sending never blocks and never waits for
//! an acknowledgement; when nobody is listening the message is dropped and
//! the drop is logged.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::storage::{TitleStore, LAST_TITLE_KEY};
use crate::types::ProductChangeEvent;

const DEFAULT_BUS_CAPACITY: usize = 64;

/// Messages sent to the external coordinator. Serialized as one JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinatorMessage {
    /// The active product's canonical title changed.
    #[serde(rename_all = "camelCase")]
    ProductChanged {
        title: String,
        url: String,
        timestamp_millis: i64,
    },
}

impl From<&ProductChangeEvent> for CoordinatorMessage {
    fn from(event: &ProductChangeEvent) -> Self {
        CoordinatorMessage::ProductChanged {
            title: event.title.as_str().to_string(),
            url: event.source_url.clone(),
            timestamp_millis: event.emitted_at_millis,
        }
    }
}

/// Asynchronous channel to the coordinator.
#[derive(Clone)]
pub struct CoordinatorBus {
    sender: broadcast::Sender<CoordinatorMessage>,
}

impl CoordinatorBus {
    /// Create a bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send to every subscriber. Returns `false` when nobody is listening.
    pub fn send(&self, message: CoordinatorMessage) -> bool {
        self.sender.send(message).is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorMessage> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CoordinatorBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// Boundary component: persists and forwards each accepted change.
pub struct Dispatcher {
    store: Box<dyn TitleStore>,
    bus: CoordinatorBus,
}

impl Dispatcher {
    pub fn new(store: Box<dyn TitleStore>, bus: CoordinatorBus) -> Self {
        Self { store, bus }
    }

    pub fn bus(&self) -> &CoordinatorBus {
        &self.bus
    }

    pub fn store(&self) -> &dyn TitleStore {
        self.store.as_ref()
    }

    /// Fire and forget. Never waits on disk or on the coordinator; failures
    /// are logged and swallowed.
    pub fn dispatch(&mut self, event: &ProductChangeEvent) {
        if let Err(e) = self.store.put(LAST_TITLE_KEY, event.title.as_str()) {
            tracing::warn!("Failed to persist last title: {e}");
        }

        if !self.bus.send(CoordinatorMessage::from(event)) {
            tracing::warn!(
                "No coordinator listening; dropped change to {:?}",
                event.title.as_str()
            );
        }
    }
}
