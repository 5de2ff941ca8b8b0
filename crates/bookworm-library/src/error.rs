//! Error types for record store operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`crate::RecordStore`] implementations.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Reading or writing the backing file failed.
    #[error("record store io failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The snapshot could not be encoded or decoded.
    #[error("record store serialization failed")]
    Serialization {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// The store refused the request.
    #[error("record store unavailable")]
    Unavailable {
        /// Operation identifier.
        operation: &'static str,
        /// Detail supplied by the store.
        detail: String,
    },
}

impl LibraryError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Operation identifier attached to the failure.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Io { operation, .. }
            | Self::Serialization { operation, .. }
            | Self::Unavailable { operation, .. } => operation,
        }
    }
}

/// Convenience alias for record store results.
pub type LibraryResult<T> = Result<T, LibraryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_is_exposed_for_every_variant() {
        let io = LibraryError::io("store.load", "/tmp/x", io::Error::other("boom"));
        assert_eq!(io.operation(), "store.load");
        assert_eq!(io.to_string(), "record store io failed");

        let unavailable = LibraryError::Unavailable {
            operation: "store.find_book",
            detail: "offline".into(),
        };
        assert_eq!(unavailable.operation(), "store.find_book");
    }
}
