// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a usable command prefix and non-zero intervals.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.bot.name.trim().is_empty() {
        fail("bot.name must not be empty".to_string());
    }

    if !LOG_LEVELS.contains(&config.bot.log_level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "bot.log_level `{}` is not one of {}",
            config.bot.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let prefix = &config.commands.prefix;
    if prefix.is_empty() {
        fail("commands.prefix must not be empty".to_string());
    } else if prefix.chars().any(char::is_whitespace) {
        fail(format!("commands.prefix `{prefix}` must not contain whitespace"));
    }

    if config.context.ttl_ms == 0 {
        fail("context.ttl_ms must be greater than 0".to_string());
    }

    if config.context.cleanup_interval_ms == 0 {
        fail("context.cleanup_interval_ms must be greater than 0".to_string());
    }

    if config.context.max_active == 0 {
        fail("context.max_active must be at least 1".to_string());
    }

    if config.pipeline.max_concurrent == 0 {
        fail("pipeline.max_concurrent must be at least 1".to_string());
    }

    if config.pipeline.queue_size == 0 {
        fail("pipeline.queue_size must be at least 1".to_string());
    }

    if config.pipeline.processing_timeout_ms == 0 {
        fail("pipeline.processing_timeout_ms must be greater than 0".to_string());
    }

    if config.pipeline.typing_delay_ms >= config.pipeline.processing_timeout_ms {
        fail(format!(
            "pipeline.typing_delay_ms ({}) must be below pipeline.processing_timeout_ms ({})",
            config.pipeline.typing_delay_ms, config.pipeline.processing_timeout_ms
        ));
    }

    if config.auto_reply.enabled && config.auto_reply.message.trim().is_empty() {
        fail("auto_reply.message must not be empty when auto_reply.enabled is true".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(errors: &[ConfigError]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn default_config_validates() {
        let config = ParleyConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn whitespace_prefix_fails_validation() {
        let mut config = ParleyConfig::default();
        config.commands.prefix = "! ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("commands.prefix"))));
    }

    #[test]
    fn zero_intervals_are_all_reported() {
        let mut config = ParleyConfig::default();
        config.context.ttl_ms = 0;
        config.context.cleanup_interval_ms = 0;
        config.pipeline.max_concurrent = 0;
        let errors = validate_config(&config).unwrap_err();
        let text = messages(&errors).join("\n");
        assert_eq!(errors.len(), 3, "{text}");
        assert!(text.contains("context.ttl_ms"));
        assert!(text.contains("context.cleanup_interval_ms"));
        assert!(text.contains("pipeline.max_concurrent"));
    }

    #[test]
    fn enabled_auto_reply_needs_a_message() {
        let mut config = ParleyConfig::default();
        config.auto_reply.enabled = true;
        config.auto_reply.message = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = ParleyConfig::default();
        config.bot.log_level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors)[0].contains("bot.log_level"));
    }

    #[test]
    fn typing_delay_must_fit_in_timeout() {
        let mut config = ParleyConfig::default();
        config.pipeline.typing_delay_ms = 60_000;
        assert!(validate_config(&config).is_err());
    }
}
