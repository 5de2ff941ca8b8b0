//! Publish failures.

use thiserror::Error;

use crate::payloads::EventId;

/// Result wrapper for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Error returned by [`crate::EventBus::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventBusError {
    /// No live subscriber received the event; it stays in the replay ring.
    #[error("event had no live subscribers")]
    SendFailed {
        /// Identifier assigned to the event.
        event_id: EventId,
        /// Kind of the undelivered event.
        event_kind: &'static str,
    },
}

impl EventBusError {
    /// Identifier the bus assigned before delivery failed.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::SendFailed { event_id, .. } => *event_id,
        }
    }

    /// Kind of the undelivered event, for log filtering.
    #[must_use]
    pub const fn event_kind(&self) -> &'static str {
        match self {
            Self::SendFailed { event_kind, .. } => event_kind,
        }
    }
}
