//! Fan-out of store changes to observing views.

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use crate::state::store::StoreEvent;

/// Broadcast hub fanning store changes out to every observing view.
pub struct EventHub {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventHub {
    /// Construct a hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a stream; lagging subscribers skip what they missed.
    pub fn stream(&self) -> impl Stream<Item = StoreEvent> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "store event subscriber lagged");
                    None
                }
            }
        })
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: StoreEvent) {
        let _ = self.sender.send(event);
    }
}
