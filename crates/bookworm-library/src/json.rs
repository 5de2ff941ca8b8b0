//! Record store persisted as a single JSON snapshot file.
//!
//! # Design
//! - The whole library is held in memory and rewritten on every save.
//! - Writes go to a sibling temp file and are renamed into place, so readers never
//!   observe a half-written snapshot.
//! - A single mutex serialises saves; a save either lands completely or not at all.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{LibraryError, LibraryResult};
use crate::model::{Book, Release};
use crate::store::RecordStore;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct LibrarySnapshot {
    #[serde(default)]
    books: BTreeMap<String, Book>,
    #[serde(default)]
    releases: BTreeMap<String, Release>,
}

/// [`RecordStore`] backed by a JSON file on disk.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    state: Mutex<LibrarySnapshot>,
}

impl JsonRecordStore {
    /// Open the snapshot at `path`, starting empty when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> LibraryResult<Self> {
        let path = path.into();
        let snapshot = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                LibraryError::Serialization {
                    operation: "store.parse",
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => LibrarySnapshot::default(),
            Err(err) => return Err(LibraryError::io("store.read", &path, err)),
        };
        debug!(
            path = %path.display(),
            books = snapshot.books.len(),
            releases = snapshot.releases.len(),
            "library snapshot loaded"
        );
        Ok(Self {
            path,
            state: Mutex::new(snapshot),
        })
    }

    /// Location of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn commit(&self, snapshot: &LibrarySnapshot) -> LibraryResult<()> {
        let encoded =
            serde_json::to_vec_pretty(snapshot).map_err(|source| LibraryError::Serialization {
                operation: "store.serialize",
                path: self.path.clone(),
                source,
            })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| LibraryError::io("store.create_parent", parent, err))?;
        }
        let staged = temp_path(&self.path);
        fs::write(&staged, encoded)
            .await
            .map_err(|err| LibraryError::io("store.write", &staged, err))?;
        fs::rename(&staged, &self.path)
            .await
            .map_err(|err| LibraryError::io("store.rename", &self.path, err))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn find_release(&self, guid: &str) -> LibraryResult<Option<Release>> {
        Ok(self.state.lock().await.releases.get(guid).cloned())
    }

    async fn find_book(&self, id: &str) -> LibraryResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(id).cloned())
    }

    async fn save_release(&self, release: &Release) -> LibraryResult<()> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.releases.insert(release.guid.clone(), release.clone());
        self.commit(&next).await?;
        *state = next;
        Ok(())
    }

    async fn save_book(&self, book: &Book) -> LibraryResult<()> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.books.insert(book.id.clone(), book.clone());
        self.commit(&next).await?;
        *state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/var/lib/bookworm/library.json")),
            PathBuf::from("/var/lib/bookworm/library.json.tmp")
        );
    }
}
