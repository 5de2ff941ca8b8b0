//! Persistence seam for books and releases.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LibraryResult;
use crate::model::{Book, Release};

/// Record store holding books and releases.
///
/// Each save is atomic for the record it writes; there is no cross-record transaction.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a release by its GUID.
    async fn find_release(&self, guid: &str) -> LibraryResult<Option<Release>>;

    /// Look up a book by identifier.
    async fn find_book(&self, id: &str) -> LibraryResult<Option<Book>>;

    /// Insert or replace a release.
    async fn save_release(&self, release: &Release) -> LibraryResult<()>;

    /// Insert or replace a book.
    async fn save_book(&self, book: &Book) -> LibraryResult<()>;
}

#[async_trait]
impl<T> RecordStore for Arc<T>
where
    T: RecordStore + ?Sized,
{
    async fn find_release(&self, guid: &str) -> LibraryResult<Option<Release>> {
        (**self).find_release(guid).await
    }

    async fn find_book(&self, id: &str) -> LibraryResult<Option<Book>> {
        (**self).find_book(id).await
    }

    async fn save_release(&self, release: &Release) -> LibraryResult<()> {
        (**self).save_release(release).await
    }

    async fn save_book(&self, book: &Book) -> LibraryResult<()> {
        (**self).save_book(book).await
    }
}
