//! # Design
//!
//! - Constant-message errors; context (paths, fields, operations) travels in fields.
//! - Per-release variants never abort a run; only staging and policy failures do.
//! - Source errors are preserved rather than interpolated.

use std::io;
use std::path::PathBuf;

use bookworm_library::LibraryError;
use thiserror::Error;

/// Result type for post-processing operations.
pub type PostProcessResult<T> = Result<T, PostProcessError>;

/// Errors produced by release post-processing.
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// The staging directory could not be listed; aborts the run.
    #[error("staging area unavailable")]
    StagingUnavailable {
        /// Staging root that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Policy value cannot be used for this run or release.
    #[error("invalid post-processing policy")]
    InvalidPolicy {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The matched release directory vanished before relocation.
    #[error("release source missing")]
    SourceMissing {
        /// Source directory that was expected.
        path: PathBuf,
    },
    /// The destination directory tree could not be created.
    #[error("destination directory creation failed")]
    DestinationCreateFailed {
        /// Destination directory.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Copying release content failed; partial content remains at the destination.
    #[error("release content copy failed")]
    CopyFailed {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Removing the staging copy failed; reported as a warning.
    #[error("release source cleanup failed")]
    CleanupFailed {
        /// Source directory that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The metadata sidecar could not be produced; reported as a warning.
    #[error("metadata generation failed")]
    MetadataGenerationFailed {
        /// Operation that failed.
        operation: &'static str,
        /// Sidecar path, or the destination when no book was available.
        path: PathBuf,
        /// Underlying IO error when one occurred.
        #[source]
        source: Option<io::Error>,
    },
    /// Saving the updated records failed after content was relocated.
    #[error("record persistence failed")]
    PersistenceFailed {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying store error.
        source: LibraryError,
    },
    /// Looking up records failed.
    #[error("record store lookup failed")]
    Store {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying store error.
        source: LibraryError,
    },
    /// Reading or writing a relocation journal failed.
    #[error("relocation journal io failure")]
    Journal {
        /// Operation that failed.
        operation: &'static str,
        /// Journal path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A relocation journal could not be encoded or decoded.
    #[error("relocation journal format failure")]
    JournalFormat {
        /// Operation that failed.
        operation: &'static str,
        /// Journal path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// A background task panicked or was cancelled.
    #[error("post-processing task failed")]
    Join {
        /// Operation that spawned the task.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
    /// The worker pool stopped accepting work.
    #[error("post-processing worker pool closed")]
    WorkerPoolClosed,
}

impl PostProcessError {
    pub(crate) fn copy(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::CopyFailed {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn journal(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Journal {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn journal_format(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::JournalFormat {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn metadata(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: Option<io::Error>,
    ) -> Self {
        Self::MetadataGenerationFailed {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the error only degrades a processed release instead of failing it.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::CleanupFailed { .. } | Self::MetadataGenerationFailed { .. }
        )
    }

    /// Human-readable detail including the innermost source, for logs and events.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            detail.push_str(": ");
            detail.push_str(&err.to_string());
            source = err.source();
        }
        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_chains_sources() {
        let err = PostProcessError::CleanupFailed {
            path: PathBuf::from("/staging/Book.bw(A1)"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "release source cleanup failed");
        assert_eq!(err.detail(), "release source cleanup failed: denied");
        assert!(err.is_warning());
    }

    #[test]
    fn metadata_without_source_reports_message_only() {
        let err = PostProcessError::metadata("metadata.book_missing", "/library/x", None);
        assert!(err.is_warning());
        assert_eq!(err.detail(), "metadata generation failed");
        assert!(!PostProcessError::WorkerPoolClosed.is_warning());
    }
}
