//! Error types for probe and aggregation operations.

use thiserror::Error;

/// Failure of a single capability probe.
///
/// Every provider converts its underlying failure into one of these
/// categories; nothing else crosses the provider boundary. A probe
/// failure never aborts an aggregation run — the orchestrator folds it
/// into the report's provenance and notes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// The backing library, firmware table, or service does not exist on
    /// this host. Expected and non-exceptional.
    #[error("unavailable: {message}")]
    Unavailable {
        /// What was missing.
        message: String,
    },

    /// The source exists but the caller lacks privilege to read it.
    #[error("access denied: {message}")]
    AccessDenied {
        /// What was denied.
        message: String,
    },

    /// The source is reachable but the specific key/value/table is absent.
    #[error("not found: {message}")]
    NotFound {
        /// What was absent.
        message: String,
    },

    /// The native library returned a failure status code.
    #[error("native call failed: {}", format_native(*.code, .message))]
    Native {
        /// Signed HRESULT-shaped result code.
        code: i32,
        /// Best-effort human text for the code.
        message: String,
    },

    /// A payload was present but malformed.
    #[error("parse error: {message}")]
    Parse {
        /// What failed to parse.
        message: String,
    },
}

impl ProbeError {
    /// Shorthand for [`ProbeError::Unavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Shorthand for [`ProbeError::AccessDenied`].
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Shorthand for [`ProbeError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for [`ProbeError::Native`].
    pub fn native(code: i32, message: impl Into<String>) -> Self {
        Self::Native {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for [`ProbeError::Parse`].
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Check whether this failure means the whole source is absent, as
    /// opposed to present-but-failing. Drives the `:NotFound` vs
    /// `:Error` provenance suffix and the ranked-provider fallback.
    #[must_use]
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::NotFound { .. })
    }

    /// Check whether a ranked provider list should try the next entry.
    ///
    /// Only a missing dependency justifies moving on; a provider that
    /// exists but fails a call answers authoritatively.
    #[must_use]
    pub fn is_dependency_missing(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

fn format_native(code: i32, message: &str) -> String {
    if message.is_empty() {
        format!("0x{code:08X}")
    } else {
        format!("0x{code:08X}: {message}")
    }
}

/// Terminal failure of an aggregation run.
///
/// Individual probe failures degrade to notes; only cancellation stops a
/// run outright, and it must never be mistaken for a complete report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// The caller's cancellation token fired before the run completed.
    #[error("aggregation cancelled")]
    Cancelled,
}
