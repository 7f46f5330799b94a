//! Logging and observability setup.
//!
//! Library crates only emit `tracing` events; the binary installs the
//! subscriber once through [`init_tracing`].

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output flavour for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, one line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON for log shippers.
    Json,
}

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("blackbox=debug,info")
            } else {
                EnvFilter::try_new("blackbox=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects between
/// `blackbox=debug,info` and `blackbox=info,warn`. Logs go to stderr so
/// command output on stdout stays machine-readable.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = default_filter(verbose);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(use_color())
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_span_events(if verbose {
                            FmtSpan::CLOSE
                        } else {
                            FmtSpan::NONE
                        })
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span wrapping one `generate` call and all of its tier attempts.
pub fn generation_span(prompt_chars: usize, start_tier: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "generation",
        prompt_chars = prompt_chars,
        start_tier = %start_tier,
    )
}

/// Span wrapping one narrative transition.
pub fn transition_span(operation: &'static str, case_id: Option<&str>) -> tracing::Span {
    span!(
        Level::DEBUG,
        "transition",
        operation = operation,
        case_id = case_id.unwrap_or("-"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_construct_without_subscriber() {
        let span = generation_span(42, "gemini-1.5-pro-latest");
        let _guard = span.enter();
        let span = transition_span("advance_act", Some("lehman"));
        let _guard = span.enter();
    }

    #[test]
    fn test_log_format_default_is_compact() {
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }
}
