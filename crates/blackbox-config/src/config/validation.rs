use std::collections::HashSet;

use regex::RegexBuilder;

use blackbox_utils::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let generation = &self.generation;

        if generation.credential_env.trim().is_empty() {
            errors.push("generation.credential_env must not be empty".to_string());
        }
        if generation.base_url.trim().is_empty() {
            errors.push("generation.base_url must not be empty".to_string());
        } else if !generation.base_url.starts_with("http://")
            && !generation.base_url.starts_with("https://")
        {
            errors.push(format!(
                "generation.base_url must be an http(s) URL, got '{}'",
                generation.base_url
            ));
        }
        if generation.attempt_timeout_secs == 0 {
            errors.push("generation.attempt_timeout_secs must be greater than 0".to_string());
        }
        if generation.default_fallback.trim().is_empty() {
            errors.push("generation.default_fallback must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&generation.temperature) {
            errors.push(format!(
                "generation.temperature must be within [0, 2], got {}",
                generation.temperature
            ));
        }
        if !(0.0..=1.0).contains(&generation.top_p) {
            errors.push(format!(
                "generation.top_p must be within [0, 1], got {}",
                generation.top_p
            ));
        }
        if generation.top_k == 0 {
            errors.push("generation.top_k must be greater than 0".to_string());
        }
        if generation.max_output_tokens == 0 {
            errors.push("generation.max_output_tokens must be greater than 0".to_string());
        }

        for signature in &generation.quota_signatures {
            if signature.trim().is_empty() {
                errors.push("generation.quota_signatures entries must not be empty".to_string());
            } else if let Err(e) = RegexBuilder::new(signature).case_insensitive(true).build() {
                errors.push(format!(
                    "generation.quota_signatures entry '{signature}' is not a valid pattern: {e}"
                ));
            }
        }

        if generation.tiers.is_empty() {
            errors.push("generation.tiers must list at least one model tier".to_string());
        }
        let mut seen = HashSet::new();
        for tier in &generation.tiers {
            if tier.id.trim().is_empty() {
                errors.push("generation.tiers entries need a non-empty id".to_string());
            } else if !seen.insert(tier.id.as_str()) {
                errors.push(format!("generation.tiers lists '{}' more than once", tier.id));
            }
        }

        if let Some(format) = &self.logging.format
            && format != "compact"
            && format != "json"
        {
            errors.push(format!(
                "logging.format must be 'compact' or 'json', got '{format}'"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed {
                error_count: errors.len(),
                errors,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CostClass, TierConfig};

    fn failures(config: &Config) -> Vec<String> {
        match config.validate() {
            Ok(()) => Vec::new(),
            Err(ConfigError::ValidationFailed { errors, .. }) => errors,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_tier_ids_rejected() {
        let mut config = Config::minimal_for_testing();
        config.generation.tiers = vec![
            TierConfig::new("m", 0, CostClass::Cheap),
            TierConfig::new("m", 1, CostClass::Cheap),
        ];
        let errors = failures(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("more than once"));
    }

    #[test]
    fn test_sampling_bounds() {
        let mut config = Config::minimal_for_testing();
        config.generation.top_p = 1.5;
        config.generation.top_k = 0;
        config.generation.max_output_tokens = 0;
        assert_eq!(failures(&config).len(), 3);
    }

    #[test]
    fn test_bad_signature_pattern_rejected() {
        let mut config = Config::minimal_for_testing();
        config.generation.quota_signatures.push("(unclosed".to_string());
        let errors = failures(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("(unclosed"));
    }

    #[test]
    fn test_blank_fallback_and_bad_log_format() {
        let mut config = Config::minimal_for_testing();
        config.generation.default_fallback = "  ".to_string();
        config.logging.format = Some("xml".to_string());
        assert_eq!(failures(&config).len(), 2);
    }
}
