//! Telemetry failures.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while installing logging or maintaining metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed or could not be set.
    #[error("tracing subscriber installation failed")]
    SubscriberInstall {
        /// Underlying subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A collector definition was rejected.
    #[error("metrics collector definition rejected")]
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// A collector could not be added to the registry.
    #[error("metrics collector registration failed")]
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The registry could not be encoded in text format.
    #[error("metrics encoding failed")]
    MetricsEncode {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Encoded metrics were not UTF-8.
    #[error("metrics output not utf-8")]
    MetricsUtf8 {
        /// Underlying conversion error.
        source: std::string::FromUtf8Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn metric_failures_keep_their_source() {
        let err = TelemetryError::MetricsRegister {
            name: "postprocess_runs_total",
            source: PrometheusError::AlreadyReg,
        };
        assert_eq!(err.to_string(), "metrics collector registration failed");
        assert!(err.source().is_some());
    }

    #[test]
    fn utf8_failure_is_reported() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let source = String::from_utf8(vec![0, 159])
            .err()
            .ok_or("expected a utf-8 error")?;
        let err = TelemetryError::MetricsUtf8 { source };
        assert_eq!(err.to_string(), "metrics output not utf-8");
        Ok(())
    }
}
