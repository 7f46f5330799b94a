//! blackbox - interactive decision-failure narratives
//!
//! A user picks a historical case (Madoff, Lehman, LTCM), walks through its
//! acts, answers questions and receives generated challenges and a personal
//! decision tool. Two pieces carry the weight:
//!
//! - [`blackbox_llm::GenerationOrchestrator`] sends each prompt through an
//!   ordered cascade of model tiers and always returns displayable text.
//! - [`blackbox_narrative::NarrativeStateMachine`] tracks case, act and
//!   sub-stage and refuses out-of-range moves without changing state.
//!
//! [`SessionCoordinator`] ties them to case content for one user session.
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use blackbox::{Config, SessionCoordinator};
//! use blackbox_llm::GenerationOrchestrator;
//! use blackbox_narrative::InMemoryContentProvider;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder().build()?;
//! let orchestrator = GenerationOrchestrator::from_config(&config)?;
//! orchestrator.initialize(std::env::var("GEMINI_API_KEY").ok().as_deref())?;
//!
//! let mut session = SessionCoordinator::new(
//!     Arc::new(InMemoryContentProvider::builtin()?),
//!     Arc::new(orchestrator),
//! );
//! session.start_case("madoff")?;
//! session.record_answer("act1_choice", "Invest immediately".into())?;
//! let challenge = session.generate_challenge().await?;
//! println!("{}", challenge.display_text());
//! # Ok(())
//! # }
//! ```
//!
//! # CLI
//!
//! ```bash
//! blackbox config --json
//! blackbox generate "Challenge my decision" --fallback "Try again later"
//! ```

pub mod cli;
pub mod coordinator;
pub mod prompts;

pub use blackbox_config::{CliArgs, Config, ConfigBuilder, ConfigSource};
pub use blackbox_utils::error::{
    BlackboxError, ConfigError, ErrorCategory, GenerationError, NarrativeError, UserFriendlyError,
};
pub use blackbox_utils::exit_codes::ExitCode;
pub use coordinator::SessionCoordinator;
pub use prompts::{Prompt, challenge_question, personalized_tool};
