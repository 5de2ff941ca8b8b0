//! Maps staging directory names to release records.

use std::path::Path;
use std::sync::Arc;

use bookworm_library::{RecordStore, Release};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{PostProcessError, PostProcessResult};

static RELEASE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.bw\(([A-Za-z0-9-]+)\)$")
        .unwrap_or_else(|err| panic!("invalid release token pattern: {err}"))
});

/// Extract the release GUID from a directory name ending in `.bw(<guid>)`.
#[must_use]
pub fn extract_release_guid(name: &str) -> Option<&str> {
    RELEASE_TOKEN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|guid| guid.as_str())
}

/// Resolves staging directories to persisted releases.
#[derive(Clone)]
pub struct ReleaseMatcher {
    store: Arc<dyn RecordStore>,
}

impl ReleaseMatcher {
    /// Build a matcher over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Match `directory` against the store.
    ///
    /// Names without a well-formed token return `Ok(None)` without touching the
    /// store; so does a token the store does not know. A hit comes back with
    /// `directory` set to the staging path.
    ///
    /// # Errors
    ///
    /// Returns [`PostProcessError::Store`] when the lookup itself fails.
    pub async fn match_directory(&self, directory: &Path) -> PostProcessResult<Option<Release>> {
        let Some(guid) = directory
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(extract_release_guid)
        else {
            debug!(directory = %directory.display(), "no release token in directory name");
            return Ok(None);
        };

        let found = self
            .store
            .find_release(guid)
            .await
            .map_err(|source| PostProcessError::Store {
                operation: "match.find_release",
                source,
            })?;

        Ok(found.map_or_else(
            || {
                debug!(
                    directory = %directory.display(),
                    release_guid = guid,
                    "release token not found in library"
                );
                None
            },
            |mut release| {
                release.directory = Some(directory.to_path_buf());
                Some(release)
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_must_terminate_the_name() {
        assert_eq!(extract_release_guid("MyBook.bw(ABC123)"), Some("ABC123"));
        assert_eq!(
            extract_release_guid("Some Title.bw(0f3e-11aa-BEEF)"),
            Some("0f3e-11aa-BEEF")
        );
        assert_eq!(extract_release_guid("MyBook.bw(ABC123) copy"), None);
        assert_eq!(extract_release_guid("MyBook.bw()"), None);
        assert_eq!(extract_release_guid("MyBook.bw(AB_12)"), None);
        assert_eq!(extract_release_guid("MyBook(ABC123)"), None);
        assert_eq!(extract_release_guid("MyBook"), None);
    }
}
