//! In-process record store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::LibraryResult;
use crate::model::{Book, Release};
use crate::store::RecordStore;

/// [`RecordStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    books: RwLock<HashMap<String, Book>>,
    releases: RwLock<HashMap<String, Release>>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given records.
    #[must_use]
    pub fn with_records(
        books: impl IntoIterator<Item = Book>,
        releases: impl IntoIterator<Item = Release>,
    ) -> Self {
        Self {
            books: RwLock::new(books.into_iter().map(|b| (b.id.clone(), b)).collect()),
            releases: RwLock::new(
                releases
                    .into_iter()
                    .map(|r| (r.guid.clone(), r))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_release(&self, guid: &str) -> LibraryResult<Option<Release>> {
        Ok(self.releases.read().await.get(guid).cloned())
    }

    async fn find_book(&self, id: &str) -> LibraryResult<Option<Book>> {
        Ok(self.books.read().await.get(id).cloned())
    }

    async fn save_release(&self, release: &Release) -> LibraryResult<()> {
        self.releases
            .write()
            .await
            .insert(release.guid.clone(), release.clone());
        Ok(())
    }

    async fn save_book(&self, book: &Book) -> LibraryResult<()> {
        self.books
            .write()
            .await
            .insert(book.id.clone(), book.clone());
        Ok(())
    }
}
