//! Outbound event publication.
//!
//! Accepted transitions hand their event here after the match's unit of work
//! has committed. The bus pushes envelopes onto a single channel; the
//! dispatcher in `server` drains it and fans each envelope out to the
//! connections subscribed to its room. Publishing can never fail the
//! operation that produced the event.

use kotak_core::{EventEnvelope, MatchEvent};
use tokio::sync::mpsc;
use tracing::warn;

/// Publish half of the event channel.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<EventEnvelope>,
}

impl EventBus {
    /// Create the bus along with the receiver the dispatcher drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish one event. Delivery problems are logged and swallowed: the
    /// state transition behind the event has already committed.
    pub fn publish(&self, event: &MatchEvent) {
        let envelope = event.envelope();
        if self.tx.send(envelope).is_err() {
            warn!("event channel closed, dropping {}", event.name());
        }
    }
}
