//! Storage configuration
//!
//! Loaded once at startup. The master secret is the only required value; its
//! absence fails [`StorageConfig::validate`] so the process never starts
//! without the ability to decrypt what it stores.

use crate::error::{StorageError, StorageResult};
use crypto::KdfSettings;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_STORAGE_ROOT: &str = "./storage";
pub const DEFAULT_TEMP_MAX_AGE_HOURS: u64 = 24;
pub const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 30;

/// Settings for [`crate::DocumentStore`].
pub struct StorageConfig {
    /// Root of the managed tree (`public/`, `encrypted/`, `temp/`, `backups/`)
    pub storage_root: PathBuf,
    /// Server-held secret all master keys are derived from
    pub master_secret: Option<SecretString>,
    pub kdf: KdfSettings,
    /// Gzip payloads before encryption
    pub compression: bool,
    /// Watermark payloads of tiers that ask for it
    pub watermark: bool,
    pub temp_max_age_hours: u64,
    pub backup_retention_days: u32,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("storage_root", &self.storage_root)
            .field("master_secret", &self.master_secret.as_ref().map(|_| "[REDACTED]"))
            .field("kdf", &self.kdf)
            .field("compression", &self.compression)
            .field("watermark", &self.watermark)
            .field("temp_max_age_hours", &self.temp_max_age_hours)
            .field("backup_retention_days", &self.backup_retention_days)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            master_secret: None,
            kdf: KdfSettings::default(),
            compression: true,
            watermark: true,
            temp_max_age_hours: DEFAULT_TEMP_MAX_AGE_HOURS,
            backup_retention_days: DEFAULT_BACKUP_RETENTION_DAYS,
        }
    }
}

impl StorageConfig {
    pub fn new(storage_root: impl Into<PathBuf>, master_secret: impl Into<String>) -> Self {
        Self {
            storage_root: storage_root.into(),
            master_secret: Some(SecretString::new(master_secret.into())),
            ..Self::default()
        }
    }

    pub fn with_kdf(mut self, kdf: KdfSettings) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_transforms(mut self, compression: bool, watermark: bool) -> Self {
        self.compression = compression;
        self.watermark = watermark;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    ///
    /// # Environment Variables
    /// - `DOCVAULT_STORAGE_ROOT` (default `./storage`)
    /// - `DOCVAULT_MASTER_SECRET` (required)
    /// - `DOCVAULT_KDF_SALT_LABEL`
    /// - `DOCVAULT_KDF_ITERATIONS_CRITICAL`, `_CONFIDENTIAL`, `_PUBLIC`
    /// - `DOCVAULT_COMPRESSION`, `DOCVAULT_WATERMARK` (bool, default true)
    /// - `DOCVAULT_TEMP_MAX_AGE_HOURS` (default 24)
    /// - `DOCVAULT_BACKUP_RETENTION_DAYS` (default 30)
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StorageResult<Self> {
        let mut config = Self::default();

        if let Some(root) = lookup("DOCVAULT_STORAGE_ROOT") {
            config.storage_root = PathBuf::from(root);
        }

        config.master_secret = lookup("DOCVAULT_MASTER_SECRET").map(SecretString::new);

        if let Some(label) = lookup("DOCVAULT_KDF_SALT_LABEL") {
            config.kdf.salt_label = label;
        }
        if let Some(value) = lookup("DOCVAULT_KDF_ITERATIONS_CRITICAL") {
            config.kdf.aead_256_iterations = parse_setting("DOCVAULT_KDF_ITERATIONS_CRITICAL", &value)?;
        }
        if let Some(value) = lookup("DOCVAULT_KDF_ITERATIONS_CONFIDENTIAL") {
            config.kdf.cbc_256_iterations = parse_setting("DOCVAULT_KDF_ITERATIONS_CONFIDENTIAL", &value)?;
        }
        if let Some(value) = lookup("DOCVAULT_KDF_ITERATIONS_PUBLIC") {
            config.kdf.cbc_128_iterations = parse_setting("DOCVAULT_KDF_ITERATIONS_PUBLIC", &value)?;
        }

        if let Some(value) = lookup("DOCVAULT_COMPRESSION") {
            config.compression = parse_flag("DOCVAULT_COMPRESSION", &value)?;
        }
        if let Some(value) = lookup("DOCVAULT_WATERMARK") {
            config.watermark = parse_flag("DOCVAULT_WATERMARK", &value)?;
        }
        if let Some(value) = lookup("DOCVAULT_TEMP_MAX_AGE_HOURS") {
            config.temp_max_age_hours = parse_setting("DOCVAULT_TEMP_MAX_AGE_HOURS", &value)?;
        }
        if let Some(value) = lookup("DOCVAULT_BACKUP_RETENTION_DAYS") {
            config.backup_retention_days = parse_setting("DOCVAULT_BACKUP_RETENTION_DAYS", &value)?;
        }

        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    /// [`StorageError::Configuration`] for a missing secret, an empty salt label
    /// or a zero work factor.
    pub fn validate(&self) -> StorageResult<()> {
        match &self.master_secret {
            Some(secret) if !secret.expose_secret().trim().is_empty() => {}
            _ => {
                return Err(StorageError::Configuration(
                    "DOCVAULT_MASTER_SECRET must be set to a non-empty value".to_string(),
                ));
            }
        }

        if self.kdf.salt_label.trim().is_empty() {
            return Err(StorageError::Configuration(
                "KDF salt label must not be empty".to_string(),
            ));
        }

        if self.kdf.aead_256_iterations == 0 || self.kdf.cbc_256_iterations == 0 || self.kdf.cbc_128_iterations == 0 {
            return Err(StorageError::Configuration(
                "KDF iteration counts must be greater than zero".to_string(),
            ));
        }

        if self.storage_root.as_os_str().is_empty() {
            return Err(StorageError::Configuration(
                "Storage root must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_setting<T: FromStr>(key: &str, value: &str) -> StorageResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| StorageError::Configuration(format!("Invalid value for {key}: {value}")))
}

fn parse_flag(key: &str, value: &str) -> StorageResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StorageError::Configuration(format!("Invalid value for {key}: {value}"))),
    }
}
