//! Completion events for processed releases.

use bookworm_events::{Event, EventBus};
use bookworm_library::{Book, Release};
use bookworm_postprocess::CompletionSink;
use bookworm_telemetry::{Metrics, current_run_id};
use tracing::{debug, warn};
use uuid::Uuid;

/// Publishes [`Event::ReleaseProcessed`] for every completion signal.
#[derive(Clone)]
pub struct EventBusSink {
    events: EventBus,
    metrics: Metrics,
}

impl EventBusSink {
    /// Sink publishing onto `events`.
    #[must_use]
    pub const fn new(events: EventBus, metrics: Metrics) -> Self {
        Self { events, metrics }
    }
}

impl CompletionSink for EventBusSink {
    fn on_processed(&self, book: &Book, release: &Release) {
        let run_id = current_run_id().unwrap_or_else(|| {
            debug!(release_guid = %release.guid, "completion signalled outside a run");
            Uuid::nil()
        });
        let directory = release
            .directory
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        publish_event(
            &self.events,
            &self.metrics,
            Event::ReleaseProcessed {
                run_id,
                book_id: book.id.clone(),
                release_guid: release.guid.clone(),
                title: book.title.clone(),
                directory,
            },
        );
    }
}

pub(crate) fn publish_event(events: &EventBus, metrics: &Metrics, event: Event) {
    metrics.inc_event(event.kind());
    if let Err(error) = events.publish(event) {
        warn!(
            event_id = error.event_id(),
            event_kind = error.event_kind(),
            error = %error,
            "failed to publish event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookworm_telemetry::with_run_context;
    use std::path::PathBuf;

    type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn processed_event_carries_active_run_id() -> TestResult<()> {
        let events = EventBus::with_capacity(8);
        let sink = EventBusSink::new(events.clone(), Metrics::new()?);
        let book = Book::new("b-1", "Great Book", "Jane Doe");
        let mut release = Release::new("ABC123", "Great Book", "b-1");
        release.directory = Some(PathBuf::from("/library/Jane Doe/Great Book"));
        let run_id = Uuid::from_u128(7);

        with_run_context(run_id, async { sink.on_processed(&book, &release) }).await;

        let backlog = events.backlog_since(0);
        assert_eq!(backlog.len(), 1);
        assert_eq!(
            backlog[0].event,
            Event::ReleaseProcessed {
                run_id,
                book_id: "b-1".into(),
                release_guid: "ABC123".into(),
                title: "Great Book".into(),
                directory: "/library/Jane Doe/Great Book".into(),
            }
        );
        Ok(())
    }

    #[test]
    fn signal_outside_run_uses_nil_run_id() -> TestResult<()> {
        let events = EventBus::with_capacity(8);
        let sink = EventBusSink::new(events.clone(), Metrics::new()?);
        sink.on_processed(
            &Book::new("b-2", "Other", "A"),
            &Release::new("X1", "Other", "b-2"),
        );
        let backlog = events.backlog_since(0);
        assert_eq!(backlog[0].event.run_id(), Some(Uuid::nil()));
        Ok(())
    }
}
