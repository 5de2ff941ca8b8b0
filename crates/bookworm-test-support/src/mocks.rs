//! Fake collaborators for the post-processing pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookworm_library::{
    Book, InMemoryRecordStore, LibraryError, LibraryResult, RecordStore, Release,
};
use bookworm_postprocess::CompletionSink;

/// Sink that records every completion signal.
#[derive(Debug, Default)]
pub struct RecordingSink {
    signals: Mutex<Vec<(Book, Release)>>,
}

impl RecordingSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals received so far, in order.
    #[must_use]
    pub fn signals(&self) -> Vec<(Book, Release)> {
        self.signals
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().clone(), |guard| guard.clone())
    }

    /// Number of signals received.
    #[must_use]
    pub fn count(&self) -> usize {
        self.signals().len()
    }
}

impl CompletionSink for RecordingSink {
    fn on_processed(&self, book: &Book, release: &Release) {
        let mut guard = match self.signals.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((book.clone(), release.clone()));
    }
}

/// Which store calls fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Every lookup fails.
    Lookups,
    /// Lookups go to the inner store; saves fail.
    Saves,
}

/// Store that fails on demand and counts every call.
#[derive(Debug)]
pub struct FailingStore {
    inner: Arc<InMemoryRecordStore>,
    mode: FailureMode,
    calls: AtomicUsize,
}

impl FailingStore {
    /// Store whose lookups always fail.
    #[must_use]
    pub fn lookups() -> Self {
        Self {
            inner: Arc::new(InMemoryRecordStore::new()),
            mode: FailureMode::Lookups,
            calls: AtomicUsize::new(0),
        }
    }

    /// Store reading from `inner` but refusing every save.
    #[must_use]
    pub const fn saves(inner: Arc<InMemoryRecordStore>) -> Self {
        Self {
            inner,
            mode: FailureMode::Saves,
            calls: AtomicUsize::new(0),
        }
    }

    /// Total number of calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn refuse(&self, operation: &'static str, mode: FailureMode) -> LibraryResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.mode == mode {
            Err(LibraryError::Unavailable {
                operation,
                detail: "injected failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn find_release(&self, guid: &str) -> LibraryResult<Option<Release>> {
        self.refuse("failing.find_release", FailureMode::Lookups)?;
        self.inner.find_release(guid).await
    }

    async fn find_book(&self, id: &str) -> LibraryResult<Option<Book>> {
        self.refuse("failing.find_book", FailureMode::Lookups)?;
        self.inner.find_book(id).await
    }

    async fn save_release(&self, release: &Release) -> LibraryResult<()> {
        self.refuse("failing.save_release", FailureMode::Saves)?;
        self.inner.save_release(release).await
    }

    async fn save_book(&self, book: &Book) -> LibraryResult<()> {
        self.refuse("failing.save_book", FailureMode::Saves)?;
        self.inner.save_book(book).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookups_fail_and_are_counted() {
        let store = FailingStore::lookups();
        assert!(store.find_release("A1").await.is_err());
        assert!(store.save_book(&Book::new("b", "t", "a")).await.is_ok());
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.on_processed(&Book::new("b-1", "One", "A"), &Release::new("A1", "One", "b-1"));
        sink.on_processed(&Book::new("b-2", "Two", "A"), &Release::new("B2", "Two", "b-2"));
        let guids: Vec<_> = sink.signals().into_iter().map(|(_, r)| r.guid).collect();
        assert_eq!(guids, vec!["A1", "B2"]);
    }
}
