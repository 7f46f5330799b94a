use camino::Utf8PathBuf;

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub credential_env: Option<String>,
    pub attempt_timeout_secs: Option<u64>,
    pub default_fallback: Option<String>,
    pub verbose: Option<bool>,
    pub log_format: Option<String>,
}
