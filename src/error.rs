// error.rs - Error types for rxvm.
//
// No-match is never an error: scans report it as `Ok(None)`. Everything
// here is either an abortive outcome the caller must distinguish from
// failure to match, or a rejected argument.

use std::time::Duration;

use thiserror::Error;

/// Error type for compilation, matching and replacement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexError {
    /// The match ran past its deadline and was abandoned.
    #[error("match timed out after {timeout:?}")]
    MatchTimeout { timeout: Duration },

    /// An argument was rejected before any scanning began.
    #[error("invalid argument `{name}`: {message}")]
    InvalidArgument {
        name: &'static str,
        message: String,
    },

    /// Tree analysis hit its depth limit and the builder asked for strict analysis.
    #[error("tree analysis exceeded depth limit {depth_limit}")]
    AnalysisIncomplete { depth_limit: u32 },

    /// Internal inconsistency (should not occur in correct usage).
    #[error("internal error: {message}")]
    InternalBug { message: String },
}

impl RegexError {
    pub(crate) fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        RegexError::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    /// Returns `true` for the timeout abort.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RegexError::MatchTimeout { .. })
    }
}
