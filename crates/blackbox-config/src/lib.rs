//! Configuration for blackbox.
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. The TOML file carries a `[generation]` section
//! (credential, endpoint, sampling, model tiers) and a `[logging]` section.
//!
//! ```toml
//! [generation]
//! credential_env = "GEMINI_API_KEY"
//! attempt_timeout_secs = 45
//!
//! [[generation.tiers]]
//! id = "gemini-1.5-pro-latest"
//! rank = 0
//! cost = "premium"
//!
//! [[generation.tiers]]
//! id = "gemini-1.5-flash-latest"
//! rank = 1
//! cost = "standard"
//!
//! [logging]
//! verbose = true
//! ```

mod config;

pub use config::*;
