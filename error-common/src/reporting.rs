// Error reporting utilities
// Turns a categorized error into a structured report and logs it once.

use crate::context::ErrorContext;
use crate::types::{Categorized, ErrorCategory};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Structured, serializable view of an error for API responses and job output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    pub code: String,
    /// Rendered message. Replaced by a generic text for non user-facing categories
    /// when produced through [`ErrorReport::for_end_user`].
    pub message: String,
    pub retryable: bool,
    pub context: ErrorContext,
}

impl ErrorReport {
    pub fn from_error<E>(error: &E, context: ErrorContext) -> Self
    where
        E: Categorized + Display + ?Sized,
    {
        let category = error.category();
        Self {
            category,
            code: error.code().to_string(),
            message: error.to_string(),
            retryable: category.is_retryable(),
            context,
        }
    }

    /// Copy of the report safe to hand to an end user.
    pub fn for_end_user(&self) -> Self {
        let mut report = self.clone();
        if !self.category.is_user_facing() {
            report.message = match self.category {
                ErrorCategory::Envelope => "The document could not be opened".to_string(),
                ErrorCategory::Configuration => "The service is misconfigured".to_string(),
                _ => "The document store is temporarily unavailable".to_string(),
            };
            report.context = ErrorContext::new();
        }
        report
    }
}

#[derive(Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    /// Log the error with its category and code and return the structured report.
    pub fn report<E>(&self, error: &E, context: ErrorContext) -> ErrorReport
    where
        E: Categorized + Display + ?Sized,
    {
        let report = ErrorReport::from_error(error, context);
        match report.category {
            ErrorCategory::Validation => tracing::info!(
                error_code = %report.code,
                error_category = %report.category,
                operation = report.context.operation.as_deref().unwrap_or("unknown"),
                "Request rejected: {}",
                report.message
            ),
            _ => tracing::error!(
                error_code = %report.code,
                error_category = %report.category,
                operation = report.context.operation.as_deref().unwrap_or("unknown"),
                "Operation failed: {}",
                report.message
            ),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct TagMismatch;

    impl fmt::Display for TagMismatch {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "authentication tag mismatch for /data/encrypted/x")
        }
    }

    impl Categorized for TagMismatch {
        fn category(&self) -> ErrorCategory {
            ErrorCategory::Envelope
        }

        fn code(&self) -> &'static str {
            crate::codes::envelope::AUTHENTICATION_FAILED
        }
    }

    #[test]
    fn test_report_carries_code_and_category() {
        let context = ErrorContext::new()
            .with_operation("retrieve")
            .with_owner(7)
            .with_document_type("identity_card");
        let report = ErrorReporter::new().report(&TagMismatch, context);

        assert_eq!(report.category, ErrorCategory::Envelope);
        assert_eq!(report.code, "ENVELOPE_3004");
        assert!(!report.retryable);
        assert_eq!(report.context.owner_id, Some(7));
    }

    #[test]
    fn test_end_user_report_hides_internal_details() {
        let report = ErrorReport::from_error(&TagMismatch, ErrorContext::new().with_path("/data"));
        let public = report.for_end_user();

        assert!(!public.message.contains("/data"));
        assert!(public.context.path.is_none());
        assert_eq!(public.code, report.code);
    }
}
