//! Staging trees, seeded records, and policies for post-processing suites.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bookworm_config::PostProcessPolicy;
use bookworm_library::{Book, BookStatus, InMemoryRecordStore, Release, ReleaseStatus};
use chrono::NaiveDate;
use tempfile::TempDir;

/// Temporary staging area and library root removed on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace with empty `staging/` and `library/` directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directories cannot be created.
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::Builder::new().prefix("bookworm-test-").tempdir()?;
        fs::create_dir_all(dir.path().join("staging"))?;
        fs::create_dir_all(dir.path().join("library"))?;
        Ok(Self { dir })
    }

    /// Root of the workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Staging directory.
    #[must_use]
    pub fn staging(&self) -> PathBuf {
        self.root().join("staging")
    }

    /// Library directory.
    #[must_use]
    pub fn library(&self) -> PathBuf {
        self.root().join("library")
    }

    /// Policy pointing at this workspace, with reconciliation disabled.
    #[must_use]
    pub fn policy(&self) -> PostProcessPolicy {
        PostProcessPolicy {
            staging_root: self.staging(),
            destination_root: self.library(),
            directory_mode: "0755".to_string(),
            parallelism: 2,
            reconcile_on_run: false,
            ..PostProcessPolicy::default()
        }
    }

    /// Create `staging/<name>` holding `files` (relative path, contents).
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be written.
    pub fn stage(&self, name: &str, files: &[(&str, &[u8])]) -> anyhow::Result<PathBuf> {
        let directory = self.staging().join(name);
        fs::create_dir_all(&directory)?;
        for (relative, contents) in files {
            let path = directory.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
        }
        Ok(directory)
    }
}

/// A snatched book published on 2020-01-01.
#[must_use]
pub fn snatched_book(id: &str, title: &str, author: &str) -> Book {
    let mut book = Book::new(id, title, author);
    book.status = BookStatus::Snatched;
    book.published = NaiveDate::from_ymd_opt(2020, 1, 1);
    book
}

/// A snatched release for `book_id`.
#[must_use]
pub fn snatched_release(guid: &str, title: &str, book_id: &str) -> Release {
    let mut release = Release::new(guid, title, book_id);
    release.status = ReleaseStatus::Snatched;
    release
}

/// In-memory store holding `books` and `releases`.
#[must_use]
pub fn seeded_store(
    books: impl IntoIterator<Item = Book>,
    releases: impl IntoIterator<Item = Release>,
) -> Arc<InMemoryRecordStore> {
    Arc::new(InMemoryRecordStore::with_records(books, releases))
}
