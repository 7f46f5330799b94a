//! Exit code constants for the blackbox operator CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments, configuration or credential |
//! | 3 | `GENERATION_FAILURE` | Generation ended without text (fallback shown) |
//! | 4 | `CONTENT_BLOCKED` | Generation refused on safety grounds |

/// Exit codes matching the documented exit code table.
///
/// ```rust
/// use blackbox_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(4), ExitCode::CONTENT_BLOCKED);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, configuration or credential
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Generation failure - every tier failed or a transport error ended the call
    pub const GENERATION_FAILURE: ExitCode = ExitCode(3);

    /// Content blocked - the provider refused the prompt
    pub const CONTENT_BLOCKED: ExitCode = ExitCode(4);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}
