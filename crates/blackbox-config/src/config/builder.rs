use std::time::Duration;

use blackbox_utils::error::ConfigError;

use super::model::default_attribution;
use super::{Config, ConfigSource, CostClass, GenerationConfig, LoggingConfig, TierConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use blackbox_config::{Config, CostClass};
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .credential_env("MY_GEMINI_KEY")
    ///     .attempt_timeout(Duration::from_secs(20))
    ///     .tier("gemini-1.5-flash-latest", 0, CostClass::Standard)
    ///     .build()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.generation.tiers.len(), 1);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`Config`] that never reads files or the environment.
///
/// Values set here are attributed to `ConfigSource::Programmatic`. Tiers added
/// with [`ConfigBuilder::tier`] replace the default tier list as a whole.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    credential_env: Option<String>,
    base_url: Option<String>,
    attempt_timeout: Option<Duration>,
    timeouts_are_quota: Option<bool>,
    quota_signatures: Option<Vec<String>>,
    default_fallback: Option<String>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    top_k: Option<u32>,
    max_output_tokens: Option<u32>,
    tiers: Vec<TierConfig>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn credential_env(mut self, name: impl Into<String>) -> Self {
        self.credential_env = Some(name.into());
        self
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-attempt deadline. Sub-second remainders are dropped.
    #[must_use]
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn timeouts_are_quota(mut self, enabled: bool) -> Self {
        self.timeouts_are_quota = Some(enabled);
        self
    }

    #[must_use]
    pub fn quota_signatures<I, S>(mut self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quota_signatures = Some(signatures.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn default_fallback(mut self, text: impl Into<String>) -> Self {
        self.default_fallback = Some(text.into());
        self
    }

    #[must_use]
    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = Some(value);
        self
    }

    #[must_use]
    pub fn top_p(mut self, value: f32) -> Self {
        self.top_p = Some(value);
        self
    }

    #[must_use]
    pub fn top_k(mut self, value: u32) -> Self {
        self.top_k = Some(value);
        self
    }

    #[must_use]
    pub fn max_output_tokens(mut self, value: u32) -> Self {
        self.max_output_tokens = Some(value);
        self
    }

    #[must_use]
    pub fn tier(mut self, id: impl Into<String>, rank: u32, cost: CostClass) -> Self {
        self.tiers.push(TierConfig::new(id, rank, cost));
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Layer the builder values over defaults and validate the result.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = default_attribution();
        let mut generation = GenerationConfig::default();
        let mut logging = LoggingConfig::default();
        let mut mark = |key: &str| {
            source_attribution.insert(key.to_string(), ConfigSource::Programmatic);
        };

        if let Some(value) = self.credential_env {
            generation.credential_env = value;
            mark("credential_env");
        }
        if let Some(value) = self.base_url {
            generation.base_url = value;
            mark("base_url");
        }
        if let Some(value) = self.attempt_timeout {
            generation.attempt_timeout_secs = value.as_secs();
            mark("attempt_timeout_secs");
        }
        if let Some(value) = self.timeouts_are_quota {
            generation.timeouts_are_quota = value;
            mark("timeouts_are_quota");
        }
        if let Some(value) = self.quota_signatures {
            generation.quota_signatures = value;
            mark("quota_signatures");
        }
        if let Some(value) = self.default_fallback {
            generation.default_fallback = value;
            mark("default_fallback");
        }
        if let Some(value) = self.temperature {
            generation.temperature = value;
            mark("temperature");
        }
        if let Some(value) = self.top_p {
            generation.top_p = value;
            mark("top_p");
        }
        if let Some(value) = self.top_k {
            generation.top_k = value;
            mark("top_k");
        }
        if let Some(value) = self.max_output_tokens {
            generation.max_output_tokens = value;
            mark("max_output_tokens");
        }
        if !self.tiers.is_empty() {
            generation.tiers = self.tiers;
            mark("tiers");
        }
        if let Some(value) = self.verbose {
            logging.verbose = value;
            mark("verbose");
        }

        let config = Config {
            generation,
            logging,
            source_attribution,
            config_path: None,
        };
        config.validate()?;
        Ok(config)
    }
}
