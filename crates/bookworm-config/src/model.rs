//! Typed configuration documents.
//!
//! # Design
//! - Documents are plain immutable values; a reload produces a fresh value.
//! - Missing fields fall back to [`crate::defaults`] through `#[serde(default)]`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_DIRECTORY_MODE, DEFAULT_FOLDER_PATTERN, DEFAULT_LOG_LEVEL,
    DEFAULT_METADATA_FILE_NAME, DEFAULT_PARALLELISM, DEFAULT_STORE_PATH,
    DEFAULT_WATCH_INTERVAL_SECS,
};
use crate::error::ConfigResult;
use crate::validate::parse_directory_mode;

/// Settings governing how completed downloads are relocated into the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessPolicy {
    /// Directory where completed downloads land.
    pub staging_root: PathBuf,
    /// Library root receiving organised content.
    pub destination_root: PathBuf,
    /// Naming pattern rendered beneath the destination root.
    pub folder_pattern: String,
    /// File name of the OPF sidecar written next to relocated content.
    pub metadata_file_name: String,
    /// Keep the staging copy after a successful relocation.
    pub keep_original: bool,
    /// Octal permission bits for created directories (e.g. `0775`).
    pub directory_mode: String,
    /// Maximum number of releases relocated at once.
    pub parallelism: usize,
    /// Repair interrupted relocations before scanning.
    pub reconcile_on_run: bool,
}

impl Default for PostProcessPolicy {
    fn default() -> Self {
        Self {
            staging_root: PathBuf::new(),
            destination_root: PathBuf::new(),
            folder_pattern: DEFAULT_FOLDER_PATTERN.to_string(),
            metadata_file_name: DEFAULT_METADATA_FILE_NAME.to_string(),
            keep_original: false,
            directory_mode: DEFAULT_DIRECTORY_MODE.to_string(),
            parallelism: DEFAULT_PARALLELISM,
            reconcile_on_run: true,
        }
    }
}

impl PostProcessPolicy {
    /// Parsed permission bits for created directories.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] when the mode is not valid octal.
    pub fn directory_mode_bits(&self) -> ConfigResult<u32> {
        parse_directory_mode(&self.directory_mode)
    }
}

/// Full application configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Post-processing policy.
    pub postprocess: PostProcessPolicy,
    /// Location of the JSON library snapshot.
    pub store_path: PathBuf,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log output format (`json` or `pretty`); inferred from the build when absent.
    pub log_format: Option<String>,
    /// Seconds between passes in watch mode.
    pub watch_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            postprocess: PostProcessPolicy::default(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: None,
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_falls_back_to_defaults() -> Result<(), serde_json::Error> {
        let config: AppConfig = serde_json::from_str(
            r#"{"postprocess": {"staging_root": "/downloads", "keep_original": true}}"#,
        )?;
        assert_eq!(config.postprocess.staging_root, PathBuf::from("/downloads"));
        assert!(config.postprocess.keep_original);
        assert_eq!(config.postprocess.folder_pattern, DEFAULT_FOLDER_PATTERN);
        assert_eq!(config.postprocess.parallelism, DEFAULT_PARALLELISM);
        assert!(config.postprocess.reconcile_on_run);
        assert_eq!(config.watch_interval_secs, DEFAULT_WATCH_INTERVAL_SECS);
        Ok(())
    }

    #[test]
    fn default_mode_parses_to_octal_bits() -> ConfigResult<()> {
        assert_eq!(PostProcessPolicy::default().directory_mode_bits()?, 0o775);
        Ok(())
    }
}
