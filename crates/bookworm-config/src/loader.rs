//! Configuration loading: JSON document first, then environment overrides.
//!
//! # Design
//! - An absent path means "defaults plus environment"; an explicit path must exist.
//! - Overrides go through [`EnvSource`] so tests never mutate the process environment.
//! - The merged document is validated before it is handed out.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;
use crate::validate::validate_config;

/// Environment variable overriding the staging root.
pub const ENV_STAGING_ROOT: &str = "BOOKWORM_STAGING_ROOT";
/// Environment variable overriding the destination root.
pub const ENV_DESTINATION_ROOT: &str = "BOOKWORM_DESTINATION_ROOT";
/// Environment variable overriding the folder pattern.
pub const ENV_FOLDER_PATTERN: &str = "BOOKWORM_FOLDER_PATTERN";
/// Environment variable overriding `keep_original`.
pub const ENV_KEEP_ORIGINAL: &str = "BOOKWORM_KEEP_ORIGINAL";
/// Environment variable overriding the relocation parallelism.
pub const ENV_PARALLELISM: &str = "BOOKWORM_PARALLELISM";
/// Environment variable overriding the library snapshot path.
pub const ENV_STORE_PATH: &str = "BOOKWORM_STORE_PATH";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "BOOKWORM_LOG_LEVEL";

/// Lookup of override values by variable name.
pub trait EnvSource {
    /// Value of `key`, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// [`EnvSource`] reading the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Load configuration from `path` (if any) and the process environment.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed, an override is
/// malformed, or the merged document fails validation.
pub fn load_config(path: Option<&Path>) -> ConfigResult<AppConfig> {
    load_config_from(path, &ProcessEnv)
}

/// Load configuration from `path` (if any) and the supplied override source.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from(path: Option<&Path>, env: &dyn EnvSource) -> ConfigResult<AppConfig> {
    let mut config = match path {
        Some(path) => read_document(path)?,
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, env)?;
    validate_config(&config)?;
    debug!(
        staging_root = %config.postprocess.staging_root.display(),
        destination_root = %config.postprocess.destination_root.display(),
        "configuration loaded"
    );
    Ok(config)
}

fn read_document(path: &Path) -> ConfigResult<AppConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_overrides(config: &mut AppConfig, env: &dyn EnvSource) -> ConfigResult<()> {
    let policy = &mut config.postprocess;
    if let Some(value) = env.get(ENV_STAGING_ROOT) {
        policy.staging_root = PathBuf::from(value);
    }
    if let Some(value) = env.get(ENV_DESTINATION_ROOT) {
        policy.destination_root = PathBuf::from(value);
    }
    if let Some(value) = env.get(ENV_FOLDER_PATTERN) {
        policy.folder_pattern = value;
    }
    if let Some(value) = env.get(ENV_KEEP_ORIGINAL) {
        policy.keep_original = parse_bool(ENV_KEEP_ORIGINAL, &value)?;
    }
    if let Some(value) = env.get(ENV_PARALLELISM) {
        policy.parallelism = value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
            variable: ENV_PARALLELISM,
            value: value.clone(),
            reason: "not_an_integer",
        })?;
    }
    if let Some(value) = env.get(ENV_STORE_PATH) {
        config.store_path = PathBuf::from(value);
    }
    if let Some(value) = env.get(ENV_LOG_LEVEL) {
        config.log_level = value;
    }
    Ok(())
}

fn parse_bool(variable: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            variable,
            value: value.to_string(),
            reason: "not_a_boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn environment_alone_can_supply_required_roots() -> ConfigResult<()> {
        let config = load_config_from(
            None,
            &env(&[
                (ENV_STAGING_ROOT, "/downloads"),
                (ENV_DESTINATION_ROOT, "/library"),
                (ENV_KEEP_ORIGINAL, "yes"),
                (ENV_PARALLELISM, " 8 "),
            ]),
        )?;
        assert_eq!(config.postprocess.staging_root, PathBuf::from("/downloads"));
        assert!(config.postprocess.keep_original);
        assert_eq!(config.postprocess.parallelism, 8);
        Ok(())
    }

    #[test]
    fn malformed_boolean_override_is_rejected() {
        let result = load_config_from(None, &env(&[(ENV_KEEP_ORIGINAL, "maybe")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidOverride {
                variable: ENV_KEEP_ORIGINAL,
                ..
            })
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        let result = load_config_from(
            Some(Path::new("/nonexistent/bookworm/config.json")),
            &HashMap::new(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::Io {
                operation: "config.read",
                ..
            })
        ));
    }
}
