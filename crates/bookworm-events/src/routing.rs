//! Event bus routing helpers.

use crate::error::{EventBusError, EventBusResult};
use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
use chrono::Utc;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

struct ReplayState {
    next_id: EventId,
    ring: VecDeque<EventEnvelope>,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    state: Arc<Mutex<ReplayState>>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity.
    ///
    /// A capacity of zero is raised to one so the broadcast channel can be built.
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            state: Arc::new(Mutex::new(ReplayState {
                next_id: 1,
                ring: VecDeque::with_capacity(replay_capacity),
            })),
            replay_capacity,
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Subscribe to the bus, replaying buffered events newer than `last_event_id`.
    #[must_use]
    pub fn subscribe(&self, last_event_id: Option<EventId>) -> EventStream {
        let state = self.lock_state();
        let receiver = self.sender.subscribe();
        let backlog: VecDeque<EventEnvelope> = last_event_id.map_or_else(VecDeque::new, |last| {
            state
                .ring
                .iter()
                .filter(|env| env.id > last)
                .cloned()
                .collect()
        });
        drop(state);
        EventStream {
            backlog,
            live: BroadcastStream::new(receiver),
        }
    }

    /// Publish a new event, assigning it the next sequential identifier.
    ///
    /// The event is retained in the replay ring even when delivery fails.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SendFailed`] when no live subscriber received the event.
    pub fn publish(&self, event: Event) -> EventBusResult<EventId> {
        let event_kind = event.kind();
        let mut state = self.lock_state();
        let id = state.next_id;
        state.next_id = state.next_id.saturating_add(1);

        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        if state.ring.len() == self.replay_capacity {
            let _ = state.ring.pop_front();
        }
        state.ring.push_back(envelope.clone());
        let delivered = self.sender.send(envelope);
        drop(state);

        delivered
            .map(|_| id)
            .map_err(|_| EventBusError::SendFailed {
                event_id: id,
                event_kind,
            })
    }

    /// Last event id observed in the replay buffer.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_state().ring.back().map(|env| env.id)
    }

    /// Collect a backlog of events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        self.lock_state()
            .ring
            .iter()
            .filter(|env| env.id > id)
            .cloned()
            .collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, ReplayState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream that yields replayed events first, then live events.
///
/// Lagged receivers skip the dropped events and continue with the oldest retained one.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    live: BroadcastStream<EventEnvelope>,
}

impl Stream for EventStream {
    type Item = EventEnvelope;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Poll::Ready(Some(envelope));
        }
        loop {
            match Pin::new(&mut self.live).poll_next(cx) {
                Poll::Ready(Some(Ok(envelope))) => return Poll::Ready(Some(envelope)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(_)))) => {}
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
