use crypto::CryptoError;
use error_common::codes;
use error_common::{Categorized, ErrorCategory};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document rejected: {}", errors.join("; "))]
    Validation {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Encrypted document {0} requires a wrapped key, owner id and document type")]
    MissingDecryptionContext(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Path {0} is outside the storage root")]
    PathOutsideRoot(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Envelope(#[from] CryptoError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl StorageError {
    /// Wrap an I/O error with the path it happened at. Missing files become
    /// [`StorageError::FileNotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::FileNotFound(path)
        } else {
            StorageError::Io { path, source }
        }
    }
}

impl Categorized for StorageError {
    fn category(&self) -> ErrorCategory {
        match self {
            StorageError::Validation { .. } | StorageError::UnknownDocumentType(_) => ErrorCategory::Validation,
            StorageError::Configuration(_) => ErrorCategory::Configuration,
            StorageError::MissingDecryptionContext(_) => ErrorCategory::Envelope,
            StorageError::Envelope(inner) => inner.category(),
            StorageError::FileNotFound(_)
            | StorageError::PathOutsideRoot(_)
            | StorageError::Io { .. }
            | StorageError::Serialization(_)
            | StorageError::Task(_) => ErrorCategory::Io,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            StorageError::Validation { .. } => codes::validation::REJECTED_UPLOAD,
            StorageError::UnknownDocumentType(_) => codes::validation::UNKNOWN_DOCUMENT_TYPE,
            StorageError::Configuration(_) => codes::configuration::INVALID_SETTING,
            StorageError::MissingDecryptionContext(_) => codes::envelope::MISSING_CONTEXT,
            StorageError::Envelope(inner) => inner.code(),
            StorageError::FileNotFound(_) => codes::io::NOT_FOUND,
            StorageError::PathOutsideRoot(_) => codes::io::PATH_OUTSIDE_ROOT,
            StorageError::Io { .. } | StorageError::Serialization(_) => codes::io::WRITE_FAILED,
            StorageError::Task(_) => codes::io::TASK_FAILED,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
