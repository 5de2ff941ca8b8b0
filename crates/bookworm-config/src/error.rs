//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Environment override could not be parsed into the target type.
    #[error("invalid environment override")]
    InvalidOverride {
        /// Environment variable carrying the override.
        variable: &'static str,
        /// Raw value supplied.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Configuration document was not valid JSON for the expected shape.
    #[error("failed to parse configuration document")]
    Parse {
        /// Document that failed to parse.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn invalid_field_keeps_context() {
        let err = ConfigError::invalid(
            "postprocess",
            "parallelism",
            Some("0".into()),
            "out_of_range",
        );
        assert_eq!(err.to_string(), "invalid configuration field");
        match err {
            ConfigError::InvalidField {
                section,
                field,
                value,
                reason,
            } => {
                assert_eq!(section, "postprocess");
                assert_eq!(field, "parallelism");
                assert_eq!(value.as_deref(), Some("0"));
                assert_eq!(reason, "out_of_range");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn io_error_exposes_source() {
        let err = ConfigError::Io {
            operation: "config.read",
            path: PathBuf::from("/missing.json"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "filesystem operation failed");
        assert!(err.source().is_some());
    }
}
