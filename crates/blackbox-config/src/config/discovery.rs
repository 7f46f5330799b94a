use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use blackbox_utils::error::ConfigError;

use super::model::{TomlConfig, default_attribution};
use super::{CliArgs, Config, ConfigSource, GenerationConfig, LoggingConfig};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "BLACKBOX_CONFIG";
/// Directory searched for upwards from the start directory.
pub const CONFIG_DIR: &str = ".blackbox";
pub const CONFIG_FILE_NAME: &str = "config.toml";

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults.
    ///
    /// Uses the current working directory for file discovery when neither
    /// `--config` nor `BLACKBOX_CONFIG` names a file.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| {
            ConfigError::InvalidFile(format!("Failed to get current directory: {e}"))
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// File resolution order: `cli_args.config_path`, then `BLACKBOX_CONFIG`,
    /// then the nearest `.blackbox/config.toml` walking upwards and stopping at
    /// a repository root. An explicit path that does not exist is an error;
    /// finding nothing by discovery is not.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut source_attribution = default_attribution();
        let mut generation = GenerationConfig::default();
        let mut logging = LoggingConfig::default();

        let config_path = match Self::explicit_config_path(cli_args) {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_string(),
                    });
                }
                Some(path)
            }
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            debug!(path = %path, "loading configuration file");
            let file_config = Self::load_config_file(path)?;
            let from_file = ConfigSource::Config;

            if let Some(section) = file_config.generation {
                let mut apply = |key: &str| {
                    source_attribution.insert(key.to_string(), from_file);
                };
                if let Some(value) = section.credential_env {
                    generation.credential_env = value;
                    apply("credential_env");
                }
                if let Some(value) = section.base_url {
                    generation.base_url = value;
                    apply("base_url");
                }
                if let Some(value) = section.attempt_timeout_secs {
                    generation.attempt_timeout_secs = value;
                    apply("attempt_timeout_secs");
                }
                if let Some(value) = section.timeouts_are_quota {
                    generation.timeouts_are_quota = value;
                    apply("timeouts_are_quota");
                }
                if let Some(value) = section.quota_signatures {
                    generation.quota_signatures = value;
                    apply("quota_signatures");
                }
                if let Some(value) = section.default_fallback {
                    generation.default_fallback = value;
                    apply("default_fallback");
                }
                if let Some(value) = section.temperature {
                    generation.temperature = value;
                    apply("temperature");
                }
                if let Some(value) = section.top_p {
                    generation.top_p = value;
                    apply("top_p");
                }
                if let Some(value) = section.top_k {
                    generation.top_k = value;
                    apply("top_k");
                }
                if let Some(value) = section.max_output_tokens {
                    generation.max_output_tokens = value;
                    apply("max_output_tokens");
                }
                if let Some(value) = section.tiers {
                    generation.tiers = value;
                    apply("tiers");
                }
            }

            if let Some(section) = file_config.logging {
                if let Some(value) = section.verbose {
                    logging.verbose = value;
                    source_attribution.insert("verbose".to_string(), from_file);
                }
                if section.format.is_some() {
                    logging.format = section.format;
                    source_attribution.insert("log_format".to_string(), from_file);
                }
            }
        }

        // CLI overrides everything
        let from_cli = ConfigSource::Cli;
        if let Some(value) = &cli_args.credential_env {
            generation.credential_env = value.clone();
            source_attribution.insert("credential_env".to_string(), from_cli);
        }
        if let Some(value) = cli_args.attempt_timeout_secs {
            generation.attempt_timeout_secs = value;
            source_attribution.insert("attempt_timeout_secs".to_string(), from_cli);
        }
        if let Some(value) = &cli_args.default_fallback {
            generation.default_fallback = value.clone();
            source_attribution.insert("default_fallback".to_string(), from_cli);
        }
        if let Some(value) = cli_args.verbose {
            logging.verbose = value;
            source_attribution.insert("verbose".to_string(), from_cli);
        }
        if let Some(value) = &cli_args.log_format {
            logging.format = Some(value.clone());
            source_attribution.insert("log_format".to_string(), from_cli);
        }

        let config = Self {
            generation,
            logging,
            source_attribution,
            config_path,
        };

        config.validate()?;
        Ok(config)
    }

    fn explicit_config_path(cli_args: &CliArgs) -> Option<Utf8PathBuf> {
        if let Some(path) = &cli_args.config_path {
            return Some(path.clone());
        }
        std::env::var(CONFIG_ENV_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Utf8PathBuf::from)
    }

    /// Search upwards from `start_dir` for `.blackbox/config.toml`.
    ///
    /// Stops at the first directory holding a `.git`, `.hg` or `.svn` marker.
    pub fn discover_config_file_from(
        start_dir: &Path,
    ) -> Result<Option<Utf8PathBuf>, ConfigError> {
        let start = Utf8Path::from_path(start_dir).ok_or_else(|| {
            ConfigError::InvalidFile(format!(
                "Start directory is not valid UTF-8: {}",
                start_dir.display()
            ))
        })?;

        let mut current_dir = Some(start);
        while let Some(dir) = current_dir {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Ok(Some(candidate));
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }

            current_dir = dir.parent();
        }

        Ok(None)
    }

    fn load_config_file(path: &Utf8Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("Failed to read config file {path}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("Failed to parse TOML config file {path}: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> Utf8PathBuf {
        let config_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join(CONFIG_FILE_NAME);
        fs::write(&path, body).unwrap();
        Utf8PathBuf::from_path_buf(path).unwrap()
    }

    #[test]
    #[serial]
    fn test_defaults_when_no_file() {
        // Setup
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        // Execute
        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();

        // Verify
        assert!(config.config_path.is_none());
        assert_eq!(config.generation, GenerationConfig::default());
        assert_eq!(config.source_of("tiers"), ConfigSource::Default);
    }

    #[test]
    #[serial]
    fn test_file_discovered_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[generation]\nattempt_timeout_secs = 15\n\n[logging]\nverbose = true\n",
        );
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_from(&nested, &CliArgs::default()).unwrap();

        assert_eq!(config.generation.attempt_timeout_secs, 15);
        assert!(config.logging.verbose);
        assert_eq!(config.source_of("attempt_timeout_secs"), ConfigSource::Config);
        assert_eq!(config.source_of("credential_env"), ConfigSource::Default);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[generation]\ncredential_env = \"FILE_KEY\"\n");

        let cli = CliArgs {
            credential_env: Some("CLI_KEY".to_string()),
            ..CliArgs::default()
        };
        let config = Config::discover_from(temp.path(), &cli).unwrap();

        assert_eq!(config.generation.credential_env, "CLI_KEY");
        assert_eq!(config.source_of("credential_env"), ConfigSource::Cli);
    }

    #[test]
    #[serial]
    fn test_explicit_missing_path_is_error() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(Utf8PathBuf::from("/definitely/not/here.toml")),
            ..CliArgs::default()
        };

        let err = Config::discover_from(temp.path(), &cli).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_env_var_names_config_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "[generation]\ntop_k = 8\n").unwrap();

        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::set_var(CONFIG_ENV_VAR, &path) };
        let result = Config::discover_from(temp.path(), &CliArgs::default());
        unsafe { std::env::remove_var(CONFIG_ENV_VAR) };

        let config = result.unwrap();
        assert_eq!(config.generation.top_k, 8);
        assert_eq!(config.source_of("top_k"), ConfigSource::Config);
    }

    #[test]
    #[serial]
    fn test_invalid_toml_reports_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[generation\n");

        let err = Config::discover_from(temp.path(), &CliArgs::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)));
    }

    #[test]
    #[serial]
    fn test_invalid_values_fail_validation() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[generation]\ntemperature = 3.5\ntiers = []\n");

        let err = Config::discover_from(temp.path(), &CliArgs::default()).unwrap_err();
        match err {
            ConfigError::ValidationFailed { error_count, .. } => assert_eq!(error_count, 2),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
