#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Telemetry primitives shared across the Bookworm workspace.
//!
//! Layout: `init.rs` (subscriber installation), `metrics.rs` (Prometheus registry),
//! `context.rs` (application and run spans), `error.rs` (telemetry failures).

pub mod context;
pub mod error;
pub mod init;
pub mod metrics;

pub use context::{GlobalContextGuard, current_run_id, record_app_mode, with_run_context};
pub use error::{Result, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_str,
};
pub use metrics::{Metrics, MetricsSnapshot};
