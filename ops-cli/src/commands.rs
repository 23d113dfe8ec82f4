//! Command handlers

use crate::cli::{Cli, Commands, OutputFormat};
use anyhow::{bail, Context};
use document_storage::{
    ContentValidator, DocumentStore, PolicyTable, StorageConfig, StorageError, UploadedFile, ValidationResult,
};
use error_common::{ErrorContext, ErrorReporter};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Run one CLI invocation.
///
/// # Errors
/// Configuration, storage and I/O failures, and rejected files for `validate`.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let policies = Arc::new(PolicyTable::standard());

    match cli.command {
        Commands::Policies => {
            let mut rules: Vec<_> = policies.iter().collect();
            rules.sort_by_key(|(document_type, _)| document_type.as_str());
            match format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = rules
                        .into_iter()
                        .map(|(document_type, rule)| {
                            serde_json::to_value(rule).map(|value| (document_type.to_string(), value))
                        })
                        .collect::<Result<_, serde_json::Error>>()?;
                    println!("{}", serde_json::to_string_pretty(&map)?);
                }
                OutputFormat::Text => {
                    for (document_type, rule) in rules {
                        println!(
                            "{document_type}: {} max={}B encrypted={} retention={}d formats={}",
                            rule.sensitivity,
                            rule.max_size_bytes,
                            rule.encryption_required,
                            rule.retention_days,
                            rule.allowed_mime_types.join(",")
                        );
                    }
                }
            }
            Ok(())
        }

        Commands::Validate {
            file,
            document_type,
            mime_type,
        } => {
            let result = validate_file(&ContentValidator::new(policies), &file, &document_type, mime_type)
                .await?;
            emit(format, &result, |r| {
                let mut lines = vec![format!("valid: {}", r.valid)];
                lines.extend(r.errors.iter().map(|e| format!("error: {e}")));
                lines.extend(r.warnings.iter().map(|w| format!("warning: {w}")));
                lines.join("\n")
            })?;
            if !result.valid {
                bail!("{} failed validation for {document_type}", file.display());
            }
            Ok(())
        }

        command => {
            let mut config = StorageConfig::from_env().map_err(|e| reported(&e, "load_config"))?;
            if let Some(root) = cli.storage_root {
                config.storage_root = root;
            }
            let store = DocumentStore::new(config, policies).map_err(|e| reported(&e, "open_store"))?;
            run_job(&store, command, format).await
        }
    }
}

async fn run_job(store: &DocumentStore, command: Commands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Stats => {
            let stats = store.stats().await.map_err(|e| reported(&e, "stats"))?;
            emit(format, &stats, |s| {
                format!(
                    "encrypted: {} files, {} bytes\npublic:    {} files, {} bytes\ntemp:      {} files, {} bytes\nbackups:   {} files, {} bytes\ntotal:     {} files, {} bytes",
                    s.encrypted.files,
                    s.encrypted.bytes,
                    s.public.files,
                    s.public.bytes,
                    s.temp.files,
                    s.temp.bytes,
                    s.backups.files,
                    s.backups.bytes,
                    s.total_files(),
                    s.total_bytes()
                )
            })
        }
        Commands::CleanupTemp { max_age_hours } => {
            let removed = match max_age_hours {
                Some(hours) => {
                    store
                        .cleanup_temp_older_than(Duration::from_secs(hours.saturating_mul(3600)))
                        .await
                }
                None => store.cleanup_temp().await,
            }
            .map_err(|e| reported(&e, "cleanup_temp"))?;
            emit(format, &serde_json::json!({ "removed": removed }), |_| {
                format!("removed {removed} temp file(s)")
            })
        }
        Commands::DailyBackup => {
            let report = store.daily_backup().await.map_err(|e| reported(&e, "daily_backup"))?;
            emit(format, &report, |r| {
                format!(
                    "backed up {} file(s), {} bytes to {}; pruned {} old backup(s)",
                    r.files_copied,
                    r.bytes_copied,
                    r.backup_dir.display(),
                    r.pruned.len()
                )
            })
        }
        Commands::EnforceRetention => {
            let report = store
                .enforce_retention()
                .await
                .map_err(|e| reported(&e, "enforce_retention"))?;
            emit(format, &report, |r| {
                format!(
                    "examined {}, deleted {}, skipped {}, failed {}",
                    r.examined,
                    r.deleted.len(),
                    r.skipped.len(),
                    r.failed.len()
                )
            })?;
            if !report.failed.is_empty() {
                bail!("{} expired document(s) could not be deleted", report.failed.len());
            }
            Ok(())
        }
        Commands::Validate { .. } | Commands::Policies => Ok(()),
    }
}

/// Validate a local file as if it had been uploaded.
///
/// # Errors
/// The file cannot be read.
pub async fn validate_file(
    validator: &ContentValidator,
    file: &Path,
    document_type: &str,
    mime_type: Option<String>,
) -> anyhow::Result<ValidationResult> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = mime_type.unwrap_or_else(|| guess_mime_type(&file_name).to_string());

    Ok(validator.validate(&UploadedFile::new(file_name, mime_type, bytes), document_type))
}

/// MIME type for the formats the store accepts, by extension.
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", text(value)),
    }
    Ok(())
}

/// Log a storage error through the shared reporter and convert it for `main`.
fn reported(error: &StorageError, operation: &str) -> anyhow::Error {
    let report = ErrorReporter::new().report(error, ErrorContext::new().with_operation(operation));
    anyhow::anyhow!("[{}] {}", report.code, report.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("a.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("b.jpeg"), "image/jpeg");
        assert_eq!(guess_mime_type("c.png"), "image/png");
        assert_eq!(guess_mime_type("d"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_validate_file_reads_and_checks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("minutes.pdf");
        let mut bytes = b"%PDF-1.5\n".to_vec();
        bytes.extend(vec![b' '; 1024]);
        tokio::fs::write(&path, &bytes).await.unwrap();

        let validator = ContentValidator::new(Arc::new(PolicyTable::standard()));
        let result = validate_file(&validator, &path, "committee_approval", None).await.unwrap();
        assert!(result.valid, "{:?}", result.errors);

        let result = validate_file(&validator, &path, "parking_photo", None).await.unwrap();
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_validate_missing_file() {
        let validator = ContentValidator::new(Arc::new(PolicyTable::standard()));
        let result = validate_file(&validator, Path::new("/definitely/not/here.pdf"), "rental_contract", None).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_reported_error_carries_code() {
        let error = StorageError::Configuration("DOCVAULT_MASTER_SECRET must be set".to_string());
        let converted = reported(&error, "open_store");
        assert!(converted.to_string().starts_with("[CONFIG_"));
    }
}
