//! Per-release outcomes and the aggregate run report.

use std::fmt;
use std::path::PathBuf;

use bookworm_library::{Book, BookStatus, Release};
use uuid::Uuid;

use crate::error::PostProcessError;

/// Why a matched release was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The owning book is not in the `snatched` state.
    NotSnatched {
        /// Status found on the book.
        status: BookStatus,
    },
    /// The release points at a book the store does not know.
    BookMissing {
        /// Identifier referenced by the release.
        book_id: String,
    },
    /// Another staging directory in the same run carries the same release token.
    DuplicateRelease,
}

impl SkipReason {
    /// Stable identifier for logs and events.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotSnatched { .. } => "not_snatched",
            Self::BookMissing { .. } => "book_missing",
            Self::DuplicateRelease => "duplicate_release",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A release that reached the library and whose records were updated.
#[derive(Debug)]
pub struct ProcessedRelease {
    /// Book after the status transition.
    pub book: Book,
    /// Release after the status transition; `directory` is the library path.
    pub release: Release,
    /// Library directory holding the content.
    pub destination: PathBuf,
    /// Staging cleanup failure, if any.
    pub cleanup_error: Option<PostProcessError>,
    /// Metadata sidecar failure, if any.
    pub metadata_error: Option<PostProcessError>,
    /// Set when the release was completed by reconciliation rather than a fresh move.
    pub reconciled: bool,
}

/// A candidate that could not be processed.
#[derive(Debug)]
pub struct FailedRelease {
    /// Matched release, when matching got that far.
    pub release: Option<Release>,
    /// Directory the failure relates to.
    pub directory: PathBuf,
    /// The failure.
    pub error: PostProcessError,
}

/// Result for one matched staging directory.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Content relocated and records updated.
    Processed(Box<ProcessedRelease>),
    /// Matched but not eligible.
    Skipped {
        /// The matched release.
        release: Release,
        /// Why it was skipped.
        reason: SkipReason,
    },
    /// Processing failed; the run continued.
    Failed(Box<FailedRelease>),
}

impl ProcessOutcome {
    /// Stable label for metrics (`processed`, `skipped`, `failed`).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Processed(_) => "processed",
            Self::Skipped { .. } => "skipped",
            Self::Failed(_) => "failed",
        }
    }

    /// Release GUID associated with the outcome, when known.
    #[must_use]
    pub fn release_guid(&self) -> Option<&str> {
        match self {
            Self::Processed(processed) => Some(processed.release.guid.as_str()),
            Self::Skipped { release, .. } => Some(release.guid.as_str()),
            Self::Failed(failed) => failed.release.as_ref().map(|r| r.guid.as_str()),
        }
    }
}

/// Aggregate result of one run.
#[derive(Debug)]
pub struct RunReport {
    /// Identifier of the run.
    pub run_id: Uuid,
    /// Outcomes in completion order.
    pub outcomes: Vec<ProcessOutcome>,
}

impl RunReport {
    /// Number of processed releases.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.count("processed")
    }

    /// Number of skipped releases.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    /// Number of failed candidates.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    /// Whether any candidate failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Whether any processed release carries a cleanup or metadata warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.outcomes.iter().any(|outcome| {
            matches!(
                outcome,
                ProcessOutcome::Processed(p) if p.cleanup_error.is_some() || p.metadata_error.is_some()
            )
        })
    }

    /// Consume the report, returning the outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<ProcessOutcome> {
        self.outcomes
    }

    fn count(&self, label: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.label() == label)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_by_label() {
        let release = Release::new("A1", "Book", "b-1");
        let report = RunReport {
            run_id: Uuid::nil(),
            outcomes: vec![
                ProcessOutcome::Skipped {
                    release: release.clone(),
                    reason: SkipReason::NotSnatched {
                        status: BookStatus::Wanted,
                    },
                },
                ProcessOutcome::Failed(Box::new(FailedRelease {
                    release: None,
                    directory: PathBuf::from("/staging/x.bw(B2)"),
                    error: PostProcessError::WorkerPoolClosed,
                })),
            ],
        };
        assert_eq!(report.processed(), 0);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert!(!report.has_warnings());
        assert_eq!(report.outcomes[0].release_guid(), Some("A1"));
        assert_eq!(report.outcomes[1].release_guid(), None);
    }
}
