//! Common error handling utilities for the DocVault engine
//!
//! Every crate in the workspace defines its own `thiserror` enum and implements
//! [`Categorized`] for it. API layers and maintenance jobs only ever look at the
//! category and the stable code, never at the rendered message.
//!
//! # Error Categories
//!
//! - **Validation**: format, size or content-safety violations in an upload
//! - **Configuration**: missing master secret or malformed settings (fatal at startup)
//! - **Envelope**: unsupported envelope version, key unwrap or authentication failure
//! - **Io**: missing files, permissions, full disks
//!
//! # Example
//!
//! ```rust
//! use error_common::{Categorized, ErrorCategory, ErrorContext, ErrorReporter};
//!
//! #[derive(Debug)]
//! struct DiskFull;
//!
//! impl std::fmt::Display for DiskFull {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "disk full")
//!     }
//! }
//!
//! impl Categorized for DiskFull {
//!     fn category(&self) -> ErrorCategory {
//!         ErrorCategory::Io
//!     }
//!
//!     fn code(&self) -> &'static str {
//!         error_common::codes::io::WRITE_FAILED
//!     }
//! }
//!
//! let report = ErrorReporter::new().report(&DiskFull, ErrorContext::new());
//! assert_eq!(report.category, ErrorCategory::Io);
//! ```

pub mod codes;
pub mod context;
pub mod reporting;
pub mod types;

pub use context::*;
pub use reporting::*;
pub use types::*;
