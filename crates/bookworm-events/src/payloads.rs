//! Event payload types carried across the platform.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A post-processing run started scanning the staging area.
    PostProcessStarted {
        /// Identifier of the run.
        run_id: Uuid,
    },
    /// A release was relocated and its records were marked downloaded.
    ReleaseProcessed {
        /// Identifier of the run that processed the release.
        run_id: Uuid,
        /// Identifier of the book the release belongs to.
        book_id: String,
        /// Release identifier extracted from the staging directory.
        release_guid: String,
        /// Book title, for notification text.
        title: String,
        /// Library directory that now holds the release content.
        directory: String,
    },
    /// A matched release was not eligible for processing.
    ReleaseSkipped {
        /// Identifier of the run.
        run_id: Uuid,
        /// Release identifier extracted from the staging directory.
        release_guid: String,
        /// Machine-friendly skip reason.
        reason: String,
    },
    /// Processing a candidate directory failed.
    ReleaseFailed {
        /// Identifier of the run.
        run_id: Uuid,
        /// Release identifier when the directory had been matched.
        release_guid: Option<String>,
        /// Staging directory the failure relates to.
        directory: String,
        /// Human-readable error detail.
        message: String,
    },
    /// A post-processing run finished.
    PostProcessCompleted {
        /// Identifier of the run.
        run_id: Uuid,
        /// Releases processed successfully.
        processed: usize,
        /// Releases skipped.
        skipped: usize,
        /// Candidates that failed.
        failed: usize,
    },
    /// Configuration update was applied.
    SettingsChanged {
        /// Description of the applied configuration change.
        description: String,
    },
    /// System health status changed (degraded or restored components).
    HealthChanged {
        /// Components currently considered degraded.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for stream consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PostProcessStarted { .. } => "post_process_started",
            Self::ReleaseProcessed { .. } => "release_processed",
            Self::ReleaseSkipped { .. } => "release_skipped",
            Self::ReleaseFailed { .. } => "release_failed",
            Self::PostProcessCompleted { .. } => "post_process_completed",
            Self::SettingsChanged { .. } => "settings_changed",
            Self::HealthChanged { .. } => "health_changed",
        }
    }

    /// Run identifier carried by post-processing events.
    #[must_use]
    pub const fn run_id(&self) -> Option<Uuid> {
        match self {
            Self::PostProcessStarted { run_id }
            | Self::ReleaseProcessed { run_id, .. }
            | Self::ReleaseSkipped { run_id, .. }
            | Self::ReleaseFailed { run_id, .. }
            | Self::PostProcessCompleted { run_id, .. } => Some(*run_id),
            Self::SettingsChanged { .. } | Self::HealthChanged { .. } => None,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_maps_post_process_variants() {
        let run_id = Uuid::nil();
        assert_event_kind(&Event::PostProcessStarted { run_id }, "post_process_started");
        assert_event_kind(
            &Event::ReleaseProcessed {
                run_id,
                book_id: "book-1".into(),
                release_guid: "ABC123".into(),
                title: "Great Book".into(),
                directory: "/library/Jane Doe/Great Book (2020)".into(),
            },
            "release_processed",
        );
        assert_event_kind(
            &Event::ReleaseSkipped {
                run_id,
                release_guid: "ABC123".into(),
                reason: "book_not_snatched".into(),
            },
            "release_skipped",
        );
        assert_event_kind(
            &Event::ReleaseFailed {
                run_id,
                release_guid: None,
                directory: "/staging/x.bw(1)".into(),
                message: "source missing".into(),
            },
            "release_failed",
        );
        assert_event_kind(
            &Event::PostProcessCompleted {
                run_id,
                processed: 1,
                skipped: 0,
                failed: 0,
            },
            "post_process_completed",
        );
    }

    #[test]
    fn system_events_have_no_run_id() {
        let settings = Event::SettingsChanged {
            description: "reload".into(),
        };
        let health = Event::HealthChanged {
            degraded: vec!["postprocess".into()],
        };
        assert_eq!(settings.kind(), "settings_changed");
        assert_eq!(health.kind(), "health_changed");
        assert!(settings.run_id().is_none());
        assert!(health.run_id().is_none());
        assert_eq!(
            Event::PostProcessStarted {
                run_id: Uuid::from_u128(7)
            }
            .run_id(),
            Some(Uuid::from_u128(7))
        );
    }

    #[test]
    fn events_serialize_with_type_tag() -> Result<(), serde_json::Error> {
        let event = Event::ReleaseSkipped {
            run_id: Uuid::nil(),
            release_guid: "ABC123".into(),
            reason: "book_not_snatched".into(),
        };
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["type"], "release_skipped");
        assert_eq!(value["release_guid"], "ABC123");
        Ok(())
    }

    fn assert_event_kind(event: &Event, expected: &str) {
        assert_eq!(event.kind(), expected);
    }
}
