mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use blackbox_utils::types::ConfigSource;
pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use discovery::{CONFIG_DIR, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
pub use model::*;

use std::time::Duration;

impl Config {
    /// Per-attempt deadline as a `Duration`.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.attempt_timeout_secs)
    }

    /// Tiers sorted by rank, ties broken by declaration order.
    #[must_use]
    pub fn tiers_by_rank(&self) -> Vec<&TierConfig> {
        let mut tiers: Vec<&TierConfig> = self.generation.tiers.iter().collect();
        tiers.sort_by_key(|tier| tier.rank);
        tiers
    }

    /// Source of a single configuration key, `Default` when untracked.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .copied()
            .unwrap_or(ConfigSource::Default)
    }

    /// Configuration with defaults only, never touching the file system.
    ///
    /// Used by tests and embedders that wire everything programmatically.
    #[must_use]
    pub fn minimal_for_testing() -> Self {
        Self {
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
            source_attribution: model::default_attribution(),
            config_path: None,
        }
    }
}
