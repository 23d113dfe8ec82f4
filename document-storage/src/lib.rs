//! # Document Storage
//!
//! Classification, validation and on-disk lifecycle for uploaded documents.
//!
//! - **Classification**: every [`DocumentType`] maps to a [`PolicyRule`] with a
//!   [`SensitivityTier`], size and format limits, retention and encryption flags
//! - **Validation**: [`ContentValidator`] checks MIME type, size, extension,
//!   magic numbers and obvious script/executable payloads, reporting every
//!   violation at once
//! - **Lifecycle**: [`DocumentStore`] stages uploads in temp storage, encrypts
//!   the ones policy requires, places them at
//!   `{root}/{public|encrypted}/{yyyy}/{mm}/user-{id}/{type}/{file}` and
//!   handles retrieval, secure deletion, archiving, backups and retention
//!
//! ## Example
//!
//! ```no_run
//! use document_storage::{DocumentStore, PolicyTable, StorageConfig, UploadedFile};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = DocumentStore::new(StorageConfig::from_env()?, Arc::new(PolicyTable::standard()))?;
//!
//! let upload = UploadedFile::new("id-front.jpg", "image/jpeg", std::fs::read("id-front.jpg")?);
//! let record = store.store(upload, "identity_card", 7).await?;
//!
//! let _original = store
//!     .retrieve(&record.absolute_path, record.decryption_context().as_ref())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod classification;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod lifecycle;
pub mod paths;
pub mod policies;
pub mod stats;
pub mod validation;

pub use classification::{DocumentType, SensitivityTier};
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use lifecycle::{
    ArchiveMetadata, ArchiveRecord, ArchiveRequest, BackupReport, DecryptionContext, DocumentStore,
    RetentionReport, StoredFileRecord,
};
pub use paths::{unique_file_name, StoragePaths};
pub use policies::{PolicyRule, PolicyTable};
pub use stats::{AreaStats, StorageStats};
pub use validation::{ContentValidator, UploadedFile, ValidationResult};
