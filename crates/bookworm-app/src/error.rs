//! # Design
//!
//! - Centralize application-level errors for bootstrap and command dispatch.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: bookworm_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: bookworm_telemetry::TelemetryError,
    },
    /// Record store operations failed.
    #[error("record store operation failed")]
    Library {
        /// Operation identifier.
        operation: &'static str,
        /// Source store error.
        source: bookworm_library::LibraryError,
    },
    /// A post-processing run failed as a whole.
    #[error("post-processing failed")]
    PostProcess {
        /// Operation identifier.
        operation: &'static str,
        /// Source post-processing error.
        source: bookworm_postprocess::PostProcessError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: bookworm_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: bookworm_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn library(
        operation: &'static str,
        source: bookworm_library::LibraryError,
    ) -> Self {
        Self::Library { operation, source }
    }

    pub(crate) const fn postprocess(
        operation: &'static str,
        source: bookworm_postprocess::PostProcessError,
    ) -> Self {
        Self::PostProcess { operation, source }
    }

    /// Message including every source in the chain, for terminal output.
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
