use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse error taxonomy shared by every crate in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rejected upload; the message lists every violation and is safe to show the end user.
    Validation,
    /// Deployment problem. Not retryable per request.
    Configuration,
    /// The stored envelope cannot be opened. The document must be treated as unrecoverable.
    Envelope,
    /// Filesystem failure, carries path context.
    Io,
}

impl ErrorCategory {
    /// Whether retrying the same call can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Io)
    }

    /// Whether the rendered message may be shown to the end user as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, ErrorCategory::Validation)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Envelope => "envelope",
            ErrorCategory::Io => "io",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every error enum in the workspace so callers can branch on
/// structure instead of message text.
pub trait Categorized {
    fn category(&self) -> ErrorCategory;

    /// Stable code from [`crate::codes`].
    fn code(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_io_is_retryable() {
        assert!(ErrorCategory::Io.is_retryable());
        assert!(!ErrorCategory::Envelope.is_retryable());
        assert!(!ErrorCategory::Configuration.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::Configuration).unwrap();
        assert_eq!(json, "\"configuration\"");
        assert_eq!(ErrorCategory::Envelope.to_string(), "envelope");
    }
}
