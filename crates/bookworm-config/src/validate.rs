//! Validation helpers for configuration documents.

use std::path::{Component, Path};

use crate::defaults::MAX_PARALLELISM;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{AppConfig, PostProcessPolicy};

const POSTPROCESS: &str = "postprocess";
const APP: &str = "app";

/// Validate an entire configuration document.
///
/// # Errors
///
/// Returns the first [`ConfigError::InvalidField`] encountered.
pub fn validate_config(config: &AppConfig) -> ConfigResult<()> {
    validate_policy(&config.postprocess)?;
    if config.store_path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(APP, "store_path", None, "empty"));
    }
    if config.log_level.trim().is_empty() {
        return Err(ConfigError::invalid(APP, "log_level", None, "empty"));
    }
    if config.watch_interval_secs == 0 {
        return Err(ConfigError::invalid(
            APP,
            "watch_interval_secs",
            Some("0".to_string()),
            "must_be_positive",
        ));
    }
    Ok(())
}

/// Parse an octal permission string such as `0775` or `755`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty, not octal, or
/// exceeds `0o7777`.
pub fn parse_directory_mode(value: &str) -> ConfigResult<u32> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(ConfigError::invalid(
            POSTPROCESS,
            "directory_mode",
            Some(value.to_string()),
            "empty",
        ));
    }
    let mode = u32::from_str_radix(digits, 8).map_err(|_| {
        ConfigError::invalid(
            POSTPROCESS,
            "directory_mode",
            Some(value.to_string()),
            "not_octal",
        )
    })?;
    if mode > 0o7777 {
        return Err(ConfigError::invalid(
            POSTPROCESS,
            "directory_mode",
            Some(value.to_string()),
            "out_of_range",
        ));
    }
    Ok(mode)
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn validate_policy(policy: &PostProcessPolicy) -> ConfigResult<()> {
    require_absolute(&policy.staging_root, "staging_root")?;
    require_absolute(&policy.destination_root, "destination_root")?;

    if policy.folder_pattern.trim().is_empty() {
        return Err(ConfigError::invalid(
            POSTPROCESS,
            "folder_pattern",
            None,
            "empty",
        ));
    }

    if !is_single_component(&policy.metadata_file_name) {
        return Err(ConfigError::invalid(
            POSTPROCESS,
            "metadata_file_name",
            Some(policy.metadata_file_name.clone()),
            "not_a_file_name",
        ));
    }

    parse_directory_mode(&policy.directory_mode)?;

    if !(1..=MAX_PARALLELISM).contains(&policy.parallelism) {
        return Err(ConfigError::invalid(
            POSTPROCESS,
            "parallelism",
            Some(policy.parallelism.to_string()),
            "out_of_range",
        ));
    }
    Ok(())
}

fn require_absolute(path: &Path, field: &'static str) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(POSTPROCESS, field, None, "empty"));
    }
    if !path.is_absolute() {
        return Err(ConfigError::invalid(
            POSTPROCESS,
            field,
            Some(path.display().to_string()),
            "not_absolute",
        ));
    }
    Ok(())
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_config() -> AppConfig {
        AppConfig {
            postprocess: PostProcessPolicy {
                staging_root: PathBuf::from("/downloads"),
                destination_root: PathBuf::from("/library"),
                ..PostProcessPolicy::default()
            },
            ..AppConfig::default()
        }
    }

    fn rejected_field(config: &AppConfig) -> Option<&'static str> {
        match validate_config(config) {
            Err(ConfigError::InvalidField { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn default_roots_are_rejected() {
        assert_eq!(rejected_field(&AppConfig::default()), Some("staging_root"));
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn relative_destination_is_rejected() {
        let mut config = valid_config();
        config.postprocess.destination_root = PathBuf::from("library");
        assert_eq!(rejected_field(&config), Some("destination_root"));
    }

    #[test]
    fn metadata_file_name_must_be_single_component() {
        for name in ["nested/metadata.opf", "..", "", "/metadata.opf"] {
            let mut config = valid_config();
            config.postprocess.metadata_file_name = name.to_string();
            assert_eq!(rejected_field(&config), Some("metadata_file_name"), "{name}");
        }
    }

    #[test]
    fn parallelism_bounds_are_enforced() {
        let mut config = valid_config();
        config.postprocess.parallelism = 0;
        assert_eq!(rejected_field(&config), Some("parallelism"));
        config.postprocess.parallelism = MAX_PARALLELISM + 1;
        assert_eq!(rejected_field(&config), Some("parallelism"));
        config.postprocess.parallelism = MAX_PARALLELISM;
        assert_eq!(rejected_field(&config), None);
    }

    #[test]
    fn directory_mode_parsing() {
        assert_eq!(parse_directory_mode("0775").ok(), Some(0o775));
        assert_eq!(parse_directory_mode("755").ok(), Some(0o755));
        assert_eq!(parse_directory_mode("0o700").ok(), Some(0o700));
        assert!(parse_directory_mode("0899").is_err());
        assert!(parse_directory_mode("17777").is_err());
        assert!(parse_directory_mode(" ").is_err());
    }

    #[test]
    fn zero_watch_interval_is_rejected() {
        let mut config = valid_config();
        config.watch_interval_secs = 0;
        assert_eq!(rejected_field(&config), Some("watch_interval_secs"));
    }
}
