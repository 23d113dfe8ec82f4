//! Storage lifecycle manager
//!
//! Each document moves through `Temp -> Final(plain|encrypted) -> [Archived] -> Deleted`.
//! Staging always happens under `{root}/temp`, and the final path is only ever
//! produced by a rename, so a partially written document is never visible there.
//!
//! Two concurrent `store` calls never share a final path because stored names
//! are unique per call. Callers that update one logical document from several
//! tasks must serialize those updates themselves.

use crate::classification::{DocumentType, SensitivityTier};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::filesystem;
use crate::paths::{self, StoragePaths};
use crate::policies::{PolicyRule, PolicyTable};
use crate::stats::{AreaStats, StorageStats};
use crate::validation::{ContentValidator, UploadedFile, ValidationResult};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use crypto::{content_hash, DocumentContext, EncryptOptions, EncryptionEnvelope, EnvelopeEngine, WrappedKey};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;

/// What `store` hands back. The caller persists it, wrapped key included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileRecord {
    pub stored_file_name: String,
    pub absolute_path: PathBuf,
    /// Hex SHA-256 of the original plaintext
    pub content_hash: String,
    pub is_encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_key: Option<WrappedKey>,
    pub original_size: u64,
    pub stored_size: u64,
    pub owner_id: u64,
    pub document_type: DocumentType,
    pub sensitivity: SensitivityTier,
    /// Non-fatal validation findings
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl StoredFileRecord {
    /// Context needed to read the document back, if it is encrypted.
    pub fn decryption_context(&self) -> Option<DecryptionContext> {
        self.wrapped_key.as_ref().map(|wrapped_key| DecryptionContext {
            wrapped_key: wrapped_key.clone(),
            owner_id: self.owner_id,
            document_type: self.document_type.as_str().to_string(),
        })
    }
}

/// Caller-held material for reading an encrypted document.
#[derive(Debug, Clone)]
pub struct DecryptionContext {
    pub wrapped_key: WrappedKey,
    pub owner_id: u64,
    pub document_type: String,
}

#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub path: PathBuf,
    pub owner_id: u64,
    pub document_type: String,
    pub reason: String,
}

/// Contents of an archive's `.meta.json` sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMetadata {
    pub original_path: PathBuf,
    pub archived_path: PathBuf,
    pub archived_at: DateTime<Utc>,
    pub owner_id: u64,
    pub document_type: String,
    pub reason: String,
    pub size: u64,
    /// Whether the archived copy is an encryption envelope
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    pub archived_path: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: ArchiveMetadata,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub backup_dir: PathBuf,
    pub files_copied: u64,
    pub bytes_copied: u64,
    /// Daily backup directories removed for exceeding the retention window
    pub pruned: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionReport {
    pub examined: u64,
    pub deleted: Vec<PathBuf>,
    /// Files outside the known layout or of unregistered document types
    pub skipped: Vec<PathBuf>,
    /// Expired files that could not be deleted
    pub failed: Vec<PathBuf>,
}

/// Paths used while storing one document.
struct Staging {
    plaintext: PathBuf,
    envelope: PathBuf,
    destination: PathBuf,
}

/// Outcome of moving one document to its final path.
struct Placement {
    content_hash: String,
    wrapped_key: Option<WrappedKey>,
    original_size: u64,
    stored_size: u64,
}

/// Document store over a local directory tree
#[derive(Debug)]
pub struct DocumentStore {
    paths: StoragePaths,
    policies: Arc<PolicyTable>,
    validator: ContentValidator,
    engine: Arc<EnvelopeEngine>,
    compression: bool,
    watermark: bool,
    temp_max_age: Duration,
    backup_retention_days: u32,
}

impl DocumentStore {
    /// Build a store from validated configuration.
    ///
    /// # Errors
    /// [`StorageError::Configuration`] when the master secret or KDF settings
    /// are unusable. Intended to fail process startup.
    pub fn new(config: StorageConfig, policies: Arc<PolicyTable>) -> StorageResult<Self> {
        config.validate()?;

        let StorageConfig {
            storage_root,
            master_secret,
            kdf,
            compression,
            watermark,
            temp_max_age_hours,
            backup_retention_days,
        } = config;

        let secret = master_secret.ok_or_else(|| {
            StorageError::Configuration("DOCVAULT_MASTER_SECRET must be set".to_string())
        })?;
        let engine = EnvelopeEngine::new(secret, kdf)?;
        let paths = StoragePaths::new(storage_root);

        tracing::info!(
            root = %paths.root().display(),
            compression,
            watermark,
            "Document store configured"
        );

        Ok(Self {
            paths,
            validator: ContentValidator::new(Arc::clone(&policies)),
            policies,
            engine: Arc::new(engine),
            compression,
            watermark,
            temp_max_age: Duration::from_secs(temp_max_age_hours.saturating_mul(3600)),
            backup_retention_days,
        })
    }

    /// Create the top-level directories. Idempotent.
    ///
    /// # Errors
    /// Directory creation failures.
    pub async fn initialize(&self) -> StorageResult<()> {
        for dir in [
            self.paths.public_root(),
            self.paths.encrypted_root(),
            self.paths.temp_dir(),
            self.paths.backups_dir(),
        ] {
            filesystem::ensure_dir(&dir).await?;
        }
        Ok(())
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Validate an upload without storing it.
    pub fn validate(&self, upload: &UploadedFile, document_type: &str) -> ValidationResult {
        self.validator.validate(upload, document_type)
    }

    /// Validate, stage, optionally encrypt and place one upload.
    ///
    /// Staged files are securely deleted whether or not the store succeeds.
    ///
    /// # Errors
    /// - [`StorageError::Validation`] with every violation when the upload is rejected
    /// - [`StorageError::Envelope`] when encryption fails
    /// - [`StorageError::Io`] for filesystem failures
    pub async fn store(
        &self,
        upload: UploadedFile,
        document_type: &str,
        owner_id: u64,
    ) -> StorageResult<StoredFileRecord> {
        let validation = self.validator.validate(&upload, document_type);
        if !validation.valid {
            tracing::info!(
                owner_id,
                document_type,
                errors = validation.errors.len(),
                "Upload rejected"
            );
            return Err(StorageError::Validation {
                errors: validation.errors,
                warnings: validation.warnings,
            });
        }
        for warning in &validation.warnings {
            tracing::warn!(owner_id, document_type, warning = %warning, "Upload accepted with warning");
        }

        let (document_type, rule) = self.policies.policy_for(document_type)?;
        let rule = rule.clone();

        let now = Utc::now();
        let stored_file_name = paths::unique_file_name(&upload.original_file_name, now);
        let staging = Staging {
            plaintext: self.paths.temp_file(&stored_file_name),
            envelope: self.paths.temp_file(&format!("{stored_file_name}.enc")),
            destination: self
                .paths
                .final_dir(rule.encryption_required, now, owner_id, document_type.as_str())
                .join(&stored_file_name),
        };

        let result = self
            .place(upload.bytes, &rule, document_type, owner_id, &staging)
            .await;

        filesystem::discard(&staging.plaintext).await;
        filesystem::discard(&staging.envelope).await;

        let placement = match result {
            Ok(placement) => placement,
            Err(e) => {
                filesystem::discard(&staging.destination).await;
                tracing::error!(
                    owner_id,
                    document_type = %document_type,
                    error = %e,
                    "Document store failed"
                );
                return Err(e);
            }
        };

        tracing::info!(
            owner_id,
            document_type = %document_type,
            sensitivity = %rule.sensitivity,
            encrypted = rule.encryption_required,
            path = %staging.destination.display(),
            "Document stored"
        );

        Ok(StoredFileRecord {
            stored_file_name,
            absolute_path: staging.destination,
            content_hash: placement.content_hash,
            is_encrypted: rule.encryption_required,
            wrapped_key: placement.wrapped_key,
            original_size: placement.original_size,
            stored_size: placement.stored_size,
            owner_id,
            document_type,
            sensitivity: rule.sensitivity,
            warnings: validation.warnings,
        })
    }

    async fn place(
        &self,
        bytes: Vec<u8>,
        rule: &PolicyRule,
        document_type: DocumentType,
        owner_id: u64,
        staging: &Staging,
    ) -> StorageResult<Placement> {
        filesystem::ensure_dir(&self.paths.temp_dir()).await?;
        fs::write(&staging.plaintext, &bytes)
            .await
            .map_err(|e| StorageError::io(&staging.plaintext, e))?;

        let original_size = bytes.len() as u64;
        let content_hash = content_hash(&bytes);

        if !rule.encryption_required {
            filesystem::rename(&staging.plaintext, &staging.destination).await?;
            return Ok(Placement {
                content_hash,
                wrapped_key: None,
                original_size,
                stored_size: original_size,
            });
        }

        let context = DocumentContext::new(owner_id, document_type.as_str());
        let algorithm = rule.sensitivity.algorithm();
        let options = EncryptOptions::new(self.compression, self.watermark && rule.sensitivity.watermarks());
        let engine = Arc::clone(&self.engine);
        let sealed = tokio::task::spawn_blocking(move || engine.encrypt(&bytes, &context, algorithm, options))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        let envelope = sealed.envelope.to_json_bytes()?;
        filesystem::write_atomic(&staging.envelope, &envelope).await?;
        filesystem::rename(&staging.envelope, &staging.destination).await?;

        Ok(Placement {
            content_hash,
            wrapped_key: Some(sealed.wrapped_key),
            original_size,
            stored_size: envelope.len() as u64,
        })
    }

    /// Read a stored document back as plaintext.
    ///
    /// # Errors
    /// - [`StorageError::PathOutsideRoot`] for paths outside the store
    /// - [`StorageError::FileNotFound`] if nothing is stored there
    /// - [`StorageError::MissingDecryptionContext`] for encrypted documents read without one
    /// - [`StorageError::Envelope`] for unreadable, tampered or foreign envelopes
    ///
    /// Files in the encrypted tree and daily backups are always envelopes.
    /// Archived copies are envelopes when their content parses as one.
    pub async fn retrieve(&self, path: &Path, context: Option<&DecryptionContext>) -> StorageResult<Vec<u8>> {
        let path = self.confine_existing(path).await?;
        let bytes = fs::read(&path).await.map_err(|e| StorageError::io(&path, e))?;

        let envelope = if self.paths.holds_envelopes(&path) {
            if context.is_none() {
                return Err(StorageError::MissingDecryptionContext(path));
            }
            EncryptionEnvelope::from_json_slice(&bytes)?
        } else if self.paths.is_archived(&path) {
            match EncryptionEnvelope::from_json_slice(&bytes) {
                Ok(envelope) => envelope,
                Err(_) => return Ok(bytes),
            }
        } else {
            return Ok(bytes);
        };

        let context = context.ok_or_else(|| StorageError::MissingDecryptionContext(path.clone()))?;
        let wrapped_key = context.wrapped_key.clone();
        let document_context = DocumentContext::new(context.owner_id, context.document_type.clone());
        let engine = Arc::clone(&self.engine);

        let plaintext = tokio::task::spawn_blocking(move || engine.decrypt(&envelope, &wrapped_key, &document_context))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
            .inspect_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Envelope could not be opened");
            })?;

        tracing::debug!(owner_id = context.owner_id, document_type = %context.document_type, "Document retrieved");
        Ok(plaintext)
    }

    /// Securely delete a stored document.
    ///
    /// # Errors
    /// [`StorageError::PathOutsideRoot`], [`StorageError::FileNotFound`] or I/O failures.
    pub async fn delete(&self, path: &Path) -> StorageResult<()> {
        let path = self.confine_existing(path).await?;
        filesystem::secure_delete(&path).await?;
        tracing::info!(path = %path.display(), "Document deleted");
        Ok(())
    }

    /// Copy a document and a JSON sidecar into the archive tree.
    ///
    /// The source stays in place; deletion is a separate decision.
    ///
    /// # Errors
    /// Unknown document types, paths outside the store, missing sources and I/O failures.
    pub async fn archive(&self, request: ArchiveRequest) -> StorageResult<ArchiveRecord> {
        let document_type: DocumentType = request.document_type.parse()?;
        let source = self.confine_existing(&request.path).await?;
        let size = fs::metadata(&source)
            .await
            .map_err(|e| StorageError::io(&source, e))?
            .len();

        let archived_at = Utc::now();
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let archived_path = self
            .paths
            .archive_file(request.owner_id, document_type.as_str(), archived_at, &file_name);
        let metadata_path = paths::sidecar_path(&archived_path);

        filesystem::copy_file(&source, &archived_path).await?;

        let metadata = ArchiveMetadata {
            original_path: source.clone(),
            archived_path: archived_path.clone(),
            archived_at,
            owner_id: request.owner_id,
            document_type: document_type.as_str().to_string(),
            reason: request.reason,
            size,
            encrypted: self.paths.holds_envelopes(&source),
        };
        let sidecar = serde_json::to_vec_pretty(&metadata)?;
        if let Err(e) = filesystem::write_atomic(&metadata_path, &sidecar).await {
            filesystem::discard(&archived_path).await;
            return Err(e);
        }

        tracing::info!(
            owner_id = request.owner_id,
            document_type = %document_type,
            reason = %metadata.reason,
            path = %archived_path.display(),
            "Document archived"
        );

        Ok(ArchiveRecord {
            archived_path,
            metadata_path,
            metadata,
        })
    }

    /// Confine `path`, then check that its real location is still inside the root.
    ///
    /// Returns the lexical path so layout checks keep working on it.
    async fn confine_existing(&self, path: &Path) -> StorageResult<PathBuf> {
        let lexical = self.paths.confine(path)?;
        let real = filesystem::canonicalize(&lexical).await?;
        let real_root = filesystem::canonicalize(self.paths.root()).await?;

        if real.starts_with(&real_root) {
            Ok(lexical)
        } else {
            tracing::warn!(
                path = %lexical.display(),
                target = %real.display(),
                "Path resolves outside the storage root"
            );
            Err(StorageError::PathOutsideRoot(path.to_path_buf()))
        }
    }

    /// Copy the encrypted tree into today's daily backup and prune old ones.
    ///
    /// # Errors
    /// I/O failures while copying or pruning.
    pub async fn daily_backup(&self) -> StorageResult<BackupReport> {
        let today = Utc::now().date_naive();
        let backup_dir = self.paths.daily_backup_dir(today);
        let encrypted_root = self.paths.encrypted_root();

        let mut report = BackupReport {
            backup_dir: backup_dir.clone(),
            ..BackupReport::default()
        };

        for entry in filesystem::walk_files(&encrypted_root).await? {
            let Ok(relative) = entry.path.strip_prefix(&encrypted_root) else {
                continue;
            };
            report.bytes_copied += filesystem::copy_file(&entry.path, &backup_dir.join(relative)).await?;
            report.files_copied += 1;
        }

        report.pruned = self.prune_daily_backups(today).await?;

        tracing::info!(
            backup_dir = %backup_dir.display(),
            files = report.files_copied,
            bytes = report.bytes_copied,
            pruned = report.pruned.len(),
            "Daily backup complete"
        );
        Ok(report)
    }

    async fn prune_daily_backups(&self, today: NaiveDate) -> StorageResult<Vec<PathBuf>> {
        let cutoff = today
            .checked_sub_signed(ChronoDuration::days(i64::from(self.backup_retention_days)))
            .unwrap_or(NaiveDate::MIN);
        let daily_dir = self.paths.daily_backups_dir();

        let mut entries = match fs::read_dir(&daily_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&daily_dir, e)),
        };

        let mut pruned = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&daily_dir, e))?
        {
            let name = entry.file_name();
            let Some(date) = name
                .to_str()
                .and_then(|n| NaiveDate::parse_from_str(n, "%Y-%m-%d").ok())
            else {
                continue;
            };

            if date < cutoff {
                let path = entry.path();
                fs::remove_dir_all(&path)
                    .await
                    .map_err(|e| StorageError::io(&path, e))?;
                pruned.push(path);
            }
        }

        Ok(pruned)
    }

    /// Securely delete staged files older than the configured max age.
    ///
    /// # Errors
    /// Failure to list the temp directory. Per-file failures are logged.
    pub async fn cleanup_temp(&self) -> StorageResult<usize> {
        self.cleanup_temp_older_than(self.temp_max_age).await
    }

    /// [`DocumentStore::cleanup_temp`] with an explicit age threshold.
    ///
    /// # Errors
    /// Failure to list the temp directory.
    pub async fn cleanup_temp_older_than(&self, max_age: Duration) -> StorageResult<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in filesystem::walk_files(&self.paths.temp_dir()).await? {
            let age = now.duration_since(entry.modified).unwrap_or_default();
            if age < max_age {
                continue;
            }
            match filesystem::secure_delete(&entry.path).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %entry.path.display(), error = %e, "Temp cleanup failed"),
            }
        }

        tracing::info!(removed, max_age_secs = max_age.as_secs(), "Temp cleanup complete");
        Ok(removed)
    }

    /// Delete stored documents older than their policy's retention period.
    ///
    /// # Errors
    /// Failure to walk the storage roots.
    pub async fn enforce_retention(&self) -> StorageResult<RetentionReport> {
        self.enforce_retention_at(Utc::now()).await
    }

    /// [`DocumentStore::enforce_retention`] evaluated as of `now`.
    ///
    /// # Errors
    /// Failure to walk the storage roots.
    pub async fn enforce_retention_at(&self, now: DateTime<Utc>) -> StorageResult<RetentionReport> {
        let mut report = RetentionReport::default();

        for root in [self.paths.public_root(), self.paths.encrypted_root()] {
            for entry in filesystem::walk_files(&root).await? {
                report.examined += 1;

                // {root}/{yyyy}/{mm}/user-{id}/{document_type}/{file}
                let rule = entry
                    .path
                    .parent()
                    .and_then(Path::file_name)
                    .and_then(|name| name.to_str())
                    .and_then(|name| self.policies.policy_for(name).ok())
                    .map(|(_, rule)| rule);
                let Some(rule) = rule else {
                    report.skipped.push(entry.path);
                    continue;
                };

                let age = now.signed_duration_since(DateTime::<Utc>::from(entry.modified));
                if age <= ChronoDuration::days(i64::from(rule.retention_days)) {
                    continue;
                }

                match filesystem::secure_delete(&entry.path).await {
                    Ok(()) => report.deleted.push(entry.path),
                    Err(e) => {
                        tracing::warn!(path = %entry.path.display(), error = %e, "Retention delete failed");
                        report.failed.push(entry.path);
                    }
                }
            }
        }

        tracing::info!(
            examined = report.examined,
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Retention enforcement complete"
        );
        Ok(report)
    }

    /// Hook for the approval workflow. Deletes the document if its policy
    /// asks for deletion after approval and reports whether it did.
    ///
    /// # Errors
    /// Deletion failures.
    pub async fn complete_approval(&self, record: &StoredFileRecord) -> StorageResult<bool> {
        let (_, rule) = self.policies.policy_for(record.document_type.as_str())?;
        if !rule.auto_delete_after_approval {
            return Ok(false);
        }

        self.delete(&record.absolute_path).await?;
        tracing::info!(
            owner_id = record.owner_id,
            document_type = %record.document_type,
            "Document removed after approval"
        );
        Ok(true)
    }

    /// Walk the store and total files and bytes per area.
    ///
    /// # Errors
    /// Failure to walk any area.
    pub async fn stats(&self) -> StorageResult<StorageStats> {
        Ok(StorageStats {
            encrypted: area_stats(&self.paths.encrypted_root()).await?,
            public: area_stats(&self.paths.public_root()).await?,
            temp: area_stats(&self.paths.temp_dir()).await?,
            backups: area_stats(&self.paths.backups_dir()).await?,
        })
    }
}

async fn area_stats(root: &Path) -> StorageResult<AreaStats> {
    let mut stats = AreaStats::default();
    for entry in filesystem::walk_files(root).await? {
        stats.record(entry.size);
    }
    Ok(stats)
}
