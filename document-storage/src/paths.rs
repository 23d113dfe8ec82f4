//! On-disk layout of the document store.
//!
//! ```text
//! {root}/public/{yyyy}/{mm}/user-{id}/{document_type}/{file}
//! {root}/encrypted/{yyyy}/{mm}/user-{id}/{document_type}/{file}
//! {root}/temp/{file}
//! {root}/backups/archived/user-{id}/{document_type}/{timestamp}-{file}[.meta.json]
//! {root}/backups/daily/{yyyy-mm-dd}/...
//! ```

use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

const MAX_STEM_LEN: usize = 64;

/// Storage path utilities rooted at one directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Final Storage ==========

    /// Root for documents stored as plaintext.
    pub fn public_root(&self) -> PathBuf {
        self.root.join("public")
    }

    /// Root for encryption envelopes.
    pub fn encrypted_root(&self) -> PathBuf {
        self.root.join("encrypted")
    }

    /// Directory a document lands in, by encryption, month, owner and type.
    pub fn final_dir(&self, encrypted: bool, at: DateTime<Utc>, owner_id: u64, document_type: &str) -> PathBuf {
        let base = if encrypted {
            self.encrypted_root()
        } else {
            self.public_root()
        };
        base.join(at.format("%Y").to_string())
            .join(at.format("%m").to_string())
            .join(format!("user-{owner_id}"))
            .join(document_type)
    }

    // ========== Staging ==========

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn temp_file(&self, file_name: &str) -> PathBuf {
        self.temp_dir().join(file_name)
    }

    // ========== Backups ==========

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    pub fn archived_root(&self) -> PathBuf {
        self.backups_dir().join("archived")
    }

    pub fn archive_dir(&self, owner_id: u64, document_type: &str) -> PathBuf {
        self.archived_root()
            .join(format!("user-{owner_id}"))
            .join(document_type)
    }

    /// Archive copy of `file_name`, prefixed with the archive timestamp.
    pub fn archive_file(&self, owner_id: u64, document_type: &str, at: DateTime<Utc>, file_name: &str) -> PathBuf {
        self.archive_dir(owner_id, document_type)
            .join(format!("{}-{file_name}", at.format("%Y%m%dT%H%M%S%.3fZ")))
    }

    pub fn daily_backups_dir(&self) -> PathBuf {
        self.backups_dir().join("daily")
    }

    pub fn daily_backup_dir(&self, date: NaiveDate) -> PathBuf {
        self.daily_backups_dir().join(date.format("%Y-%m-%d").to_string())
    }

    // ========== Confinement ==========

    /// Resolve `path` against the root and reject anything that escapes it.
    ///
    /// Relative paths are taken relative to the root. Resolution is lexical, so
    /// the target does not need to exist and symlinks are not followed; callers
    /// reading existing files also check the resolved location.
    pub fn confine(&self, path: &Path) -> StorageResult<PathBuf> {
        let lexical = normalize(path);
        let resolved = if path.is_absolute() || lexical.starts_with(&self.root) {
            lexical
        } else {
            normalize(&self.root.join(path))
        };

        if resolved.starts_with(&self.root) && resolved != self.root {
            Ok(resolved)
        } else {
            Err(StorageError::PathOutsideRoot(path.to_path_buf()))
        }
    }

    /// Whether a confined path lives under the encrypted root.
    pub fn is_encrypted(&self, path: &Path) -> bool {
        path.starts_with(self.encrypted_root())
    }

    /// Whether every file at this location is an envelope: the encrypted tree
    /// and its daily backups.
    pub fn holds_envelopes(&self, path: &Path) -> bool {
        self.is_encrypted(path) || path.starts_with(self.daily_backups_dir())
    }

    /// Whether a confined path lives in the archive, which mixes envelopes and plaintext.
    pub fn is_archived(&self, path: &Path) -> bool {
        path.starts_with(self.archived_root())
    }
}

/// Append `.meta.json` to an archived file's name.
pub fn sidecar_path(archived: &Path) -> PathBuf {
    let mut name = archived.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".meta.json");
    archived.with_file_name(name)
}

/// Collision-free stored name: `{stem}-{yyyymmddHHMMSS}-{uuid}.{ext}`.
///
/// The stem is reduced to `[A-Za-z0-9_-]`; a missing extension becomes `bin`.
pub fn unique_file_name(original_file_name: &str, at: DateTime<Utc>) -> String {
    let path = Path::new(original_file_name);

    let stem: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_STEM_LEN)
        .collect();
    let stem = stem.trim_matches('_');
    let stem = if stem.is_empty() { "document" } else { stem };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.chars().filter(char::is_ascii_alphanumeric).collect::<String>().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "bin".to_string());

    format!(
        "{stem}-{}-{}.{extension}",
        at.format("%Y%m%d%H%M%S"),
        Uuid::new_v4().simple()
    )
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_final_dir_layout() {
        let paths = StoragePaths::new("/srv/docs");
        assert_eq!(
            paths.final_dir(true, at(), 7, "identity_card"),
            PathBuf::from("/srv/docs/encrypted/2024/03/user-7/identity_card")
        );
        assert_eq!(
            paths.final_dir(false, at(), 7, "parking_photo"),
            PathBuf::from("/srv/docs/public/2024/03/user-7/parking_photo")
        );
    }

    #[test]
    fn test_archive_layout() {
        let paths = StoragePaths::new("/srv/docs");
        let archived = paths.archive_file(7, "rental_contract", at(), "lease.pdf");
        assert!(archived.starts_with("/srv/docs/backups/archived/user-7/rental_contract"));
        assert!(archived.to_string_lossy().ends_with("-lease.pdf"));
        assert!(sidecar_path(&archived).to_string_lossy().ends_with("-lease.pdf.meta.json"));
    }

    #[test]
    fn test_daily_backup_dir() {
        let paths = StoragePaths::new("/srv/docs");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(paths.daily_backup_dir(date), PathBuf::from("/srv/docs/backups/daily/2024-03-09"));
    }

    #[test]
    fn test_unique_names_do_not_collide() {
        let names: HashSet<String> = (0..500).map(|_| unique_file_name("scan.pdf", at())).collect();
        assert_eq!(names.len(), 500);
    }

    #[test]
    fn test_unique_name_format() {
        let name = unique_file_name("My ID (front).JPG", at());
        assert!(name.starts_with("My_ID__front-20240309140507-"), "{name}");
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_unique_name_without_stem_or_extension() {
        let name = unique_file_name("../..", at());
        assert!(name.starts_with("document-"));
        assert!(name.ends_with(".bin"));
    }

    #[test]
    fn test_confine_accepts_inside_paths() {
        let paths = StoragePaths::new("/srv/docs");
        assert_eq!(
            paths.confine(Path::new("public/2024/a.png")).unwrap(),
            PathBuf::from("/srv/docs/public/2024/a.png")
        );
        assert!(paths.confine(Path::new("/srv/docs/./encrypted/x")).is_ok());
    }

    #[test]
    fn test_confine_rejects_escapes() {
        let paths = StoragePaths::new("/srv/docs");
        for escape in ["/etc/passwd", "../other/file", "/srv/docs/../docs-evil/x", "/srv/docs"] {
            assert!(
                matches!(paths.confine(Path::new(escape)), Err(StorageError::PathOutsideRoot(_))),
                "{escape}"
            );
        }
    }

    #[test]
    fn test_confine_with_relative_root() {
        let paths = StoragePaths::new("./storage");
        let stored = paths.final_dir(false, at(), 1, "parking_photo").join("a.png");
        assert_eq!(paths.confine(&stored).unwrap(), stored);
        assert!(paths.confine(Path::new("../elsewhere/a.png")).is_err());
    }

    #[test]
    fn test_is_encrypted() {
        let paths = StoragePaths::new("/srv/docs");
        assert!(paths.is_encrypted(Path::new("/srv/docs/encrypted/2024/03/user-1/x/y")));
        assert!(!paths.is_encrypted(Path::new("/srv/docs/public/2024/03/user-1/x/y")));

        assert!(paths.holds_envelopes(Path::new("/srv/docs/encrypted/2024/03/user-1/x/y")));
        assert!(paths.holds_envelopes(Path::new("/srv/docs/backups/daily/2024-03-09/2024/03/user-1/x/y")));
        assert!(!paths.holds_envelopes(Path::new("/srv/docs/backups/archived/user-1/x/y")));
        assert!(paths.is_archived(Path::new("/srv/docs/backups/archived/user-1/x/y")));
        assert!(!paths.is_archived(Path::new("/srv/docs/public/2024/03/user-1/x/y")));
    }
}
