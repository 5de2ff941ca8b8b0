//! Fallback values applied when the configuration document omits a field.
//!
//! # Design
//! - Keep every default in one place so the loader and docs agree.

/// Folder naming pattern used when none is configured.
pub const DEFAULT_FOLDER_PATTERN: &str = "$Author/$Title";
/// Sidecar metadata filename written next to relocated content.
pub const DEFAULT_METADATA_FILE_NAME: &str = "metadata.opf";
/// Octal permission bits applied to created directories.
pub const DEFAULT_DIRECTORY_MODE: &str = "0775";
/// Number of releases relocated concurrently.
pub const DEFAULT_PARALLELISM: usize = 4;
/// Upper bound accepted for the parallelism setting.
pub const MAX_PARALLELISM: usize = 64;
/// Library snapshot file used by the JSON record store.
pub const DEFAULT_STORE_PATH: &str = "bookworm-library.json";
/// Default log level when neither config nor `RUST_LOG` provide one.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Seconds between runs in watch mode.
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 60;
