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

//! File-backed configuration for the Bookworm post-processing service.
//!
//! Layout: `model.rs` (typed config documents), `defaults.rs` (fallback values),
//! `loader.rs` (JSON file + environment overrides), `validate.rs` (field checks),
//! `service.rs` (`ConfigService` snapshots and reload notifications).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod service;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{EnvSource, ProcessEnv, load_config, load_config_from};
pub use model::{AppConfig, PostProcessPolicy};
pub use service::{ConfigService, ConfigWatcher};
pub use validate::{parse_directory_mode, validate_config};
