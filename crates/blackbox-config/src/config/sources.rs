use std::collections::BTreeMap;

use super::Config;

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();
        let generation = &self.generation;

        let mut add = |key: &str, value: String| {
            let source = self.source_of(key).as_str().to_string();
            config.insert(key.to_string(), (value, source));
        };

        add("credential_env", generation.credential_env.clone());
        add("base_url", generation.base_url.clone());
        add(
            "attempt_timeout_secs",
            generation.attempt_timeout_secs.to_string(),
        );
        add(
            "timeouts_are_quota",
            generation.timeouts_are_quota.to_string(),
        );
        add("quota_signatures", generation.quota_signatures.join(", "));
        add("default_fallback", generation.default_fallback.clone());
        add("temperature", generation.temperature.to_string());
        add("top_p", generation.top_p.to_string());
        add("top_k", generation.top_k.to_string());
        add("max_output_tokens", generation.max_output_tokens.to_string());
        add(
            "tiers",
            self.tiers_by_rank()
                .iter()
                .map(|tier| format!("{}({})", tier.id, tier.cost))
                .collect::<Vec<_>>()
                .join(" > "),
        );
        add("verbose", self.logging.verbose.to_string());
        add(
            "log_format",
            self.logging
                .format
                .clone()
                .unwrap_or_else(|| "compact".to_string()),
        );

        config
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, ConfigSource};

    #[test]
    fn test_effective_config_reports_sources() {
        let mut config = Config::minimal_for_testing();
        config
            .source_attribution
            .insert("top_k".to_string(), ConfigSource::Cli);

        let effective = config.effective_config();

        assert_eq!(
            effective.get("top_k"),
            Some(&("40".to_string(), "cli".to_string()))
        );
        assert_eq!(effective["credential_env"].0, "GEMINI_API_KEY");
        assert_eq!(effective["credential_env"].1, "default");
        assert_eq!(
            effective["tiers"].0,
            "gemini-1.5-pro-latest(premium) > gemini-1.5-flash-latest(standard) > gemini-1.5-flash-8b(cheap)"
        );
    }
}
