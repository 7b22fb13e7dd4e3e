//! Validation helpers for configuration documents and API keys.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ConfigError, ConfigResult};
use crate::model::UploaderConfig;

const API_KEY_PATTERN: &str = r"^[a-f0-9]{40};[a-f0-9]{40};[0-9]+$";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

// A pattern that fails to compile rejects every key.
static API_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(API_KEY_PATTERN).ok());

/// Whether `key` has the `<40 hex>;<40 hex>;<account id>` shape issued by the service.
#[must_use]
pub fn valid_api_key(key: &str) -> bool {
    API_KEY
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(key.trim()))
}

/// Hide everything but the account suffix of an API key for display.
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    key.trim()
        .rsplit_once(';')
        .map_or_else(|| "****".to_string(), |(_, account)| format!("****;{account}"))
}

/// Check every field of the document that the pipeline depends on.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the first offending field.
pub fn validate(config: &UploaderConfig) -> ConfigResult<()> {
    let root = config.api_root.trim();
    if !(root.starts_with("http://") || root.starts_with("https://")) {
        return Err(ConfigError::invalid("api_root", "not_http_url", root));
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::invalid(
            "logging.level",
            "unknown_level",
            &config.logging.level,
        ));
    }

    let pipeline = &config.pipeline;
    for (field, value) in [
        ("pipeline.stability_interval_ms", pipeline.stability_interval_ms),
        ("pipeline.status_interval_ms", pipeline.status_interval_ms),
        ("pipeline.min_replay_bytes", pipeline.min_replay_bytes),
        ("pipeline.http_timeout_secs", pipeline.http_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid(field, "zero", value));
        }
    }

    if pipeline.replay_suffix.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            field: "pipeline.replay_suffix",
            reason: "empty",
            value: None,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> String {
        format!("{};{};12345", "a1".repeat(20), "0f".repeat(20))
    }

    #[test]
    fn api_key_shape_is_enforced() {
        assert!(valid_api_key(&sample_key()));
        assert!(valid_api_key(&format!("  {}\n", sample_key())));
        assert!(!valid_api_key(""));
        assert!(!valid_api_key("user@example.com"));
        assert!(!valid_api_key(&format!("{};{}", "a".repeat(40), "b".repeat(40))));
        assert!(!valid_api_key(&format!("{};{};12a", "a".repeat(40), "b".repeat(40))));
        assert!(!valid_api_key(&format!("{};{};1", "A".repeat(40), "b".repeat(40))));
        assert!(!valid_api_key(&format!("{};{};1;2", "a".repeat(40), "b".repeat(40))));
        assert!(!valid_api_key(&format!("{};{};1", "a".repeat(41), "b".repeat(40))));
        assert!(!valid_api_key(&format!("{};{};", "a".repeat(40), "b".repeat(40))));
    }

    #[test]
    fn mask_keeps_only_account_suffix() {
        assert_eq!(mask_api_key(&sample_key()), "****;12345");
        assert_eq!(mask_api_key("garbage"), "****");
    }

    #[test]
    fn defaults_validate() {
        assert!(validate(&UploaderConfig::default()).is_ok());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = UploaderConfig::default();
        config.pipeline.status_interval_ms = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidField {
                field: "pipeline.status_interval_ms",
                reason: "zero",
                ..
            })
        ));
    }

    #[test]
    fn unknown_level_and_bad_root_are_rejected() {
        let mut config = UploaderConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidField {
                field: "logging.level",
                ..
            })
        ));

        let mut config = UploaderConfig::default();
        config.api_root = "ftp://example.com".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidField {
                field: "api_root",
                ..
            })
        ));
    }

    #[test]
    fn empty_suffix_is_rejected() {
        let mut config = UploaderConfig::default();
        config.pipeline.replay_suffix = "  ".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidField {
                field: "pipeline.replay_suffix",
                reason: "empty",
                value: None,
            })
        ));
    }
}
