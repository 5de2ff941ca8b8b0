//! Completion signal seam.

use bookworm_library::{Book, Release};

/// Receives one signal per processed release, after its records are saved.
pub trait CompletionSink: Send + Sync {
    /// Called with the updated book and release.
    fn on_processed(&self, book: &Book, release: &Release);
}

/// Sink that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl CompletionSink for NoopSink {
    fn on_processed(&self, _book: &Book, _release: &Release) {}
}
