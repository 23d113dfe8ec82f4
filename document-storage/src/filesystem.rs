//! Async file primitives used by the lifecycle manager.

use crate::error::{StorageError, StorageResult};
use rand::rngs::OsRng;
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;

/// Overwrite passes performed by [`secure_delete`].
pub const SECURE_DELETE_PASSES: usize = 3;

const OVERWRITE_CHUNK: usize = 64 * 1024;

/// A regular file found by [`walk_files`].
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

pub async fn ensure_dir(path: &Path) -> StorageResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| StorageError::io(path, e))
}

/// Write `bytes` to a sibling temp file, fsync it, then rename over `path`.
///
/// Readers of `path` see either the old content or the complete new content.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent directory"),
        })?;
    ensure_dir(parent).await?;

    let staging = parent.join(format!(".{}.partial", Uuid::new_v4().simple()));
    let result: StorageResult<()> = async {
        let mut file = fs::File::create(&staging)
            .await
            .map_err(|e| StorageError::io(&staging, e))?;
        file.write_all(bytes).await.map_err(|e| StorageError::io(&staging, e))?;
        file.sync_all().await.map_err(|e| StorageError::io(&staging, e))?;
        drop(file);
        rename(&staging, path).await
    }
    .await;

    if result.is_err() {
        if let Err(e) = fs::remove_file(&staging).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %staging.display(), error = %e, "Failed to remove partial file");
            }
        }
    }
    result
}

/// Real location of an existing path, symlinks resolved.
pub async fn canonicalize(path: &Path) -> StorageResult<PathBuf> {
    fs::canonicalize(path).await.map_err(|e| StorageError::io(path, e))
}

/// Rename within the storage root, creating the destination directory.
pub async fn rename(from: &Path, to: &Path) -> StorageResult<()> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent).await?;
    }
    fs::rename(from, to).await.map_err(|e| StorageError::io(from, e))
}

/// Copy a file, creating the destination directory. Returns bytes copied.
pub async fn copy_file(from: &Path, to: &Path) -> StorageResult<u64> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent).await?;
    }
    fs::copy(from, to).await.map_err(|e| StorageError::io(from, e))
}

/// Overwrite a file with random bytes [`SECURE_DELETE_PASSES`] times, then unlink it.
///
/// Best effort only: journaling and copy-on-write filesystems, SSD wear
/// levelling and snapshots can all keep older blocks around.
pub async fn secure_delete(path: &Path) -> StorageResult<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| StorageError::io(path, e))?
        .len();

    for _ in 0..SECURE_DELETE_PASSES {
        file.seek(std::io::SeekFrom::Start(0))
            .await
            .map_err(|e| StorageError::io(path, e))?;

        let mut remaining = len;
        while remaining > 0 {
            let n = usize::try_from(remaining).map_or(OVERWRITE_CHUNK, |r| r.min(OVERWRITE_CHUNK));
            let mut block = vec![0u8; n];
            OsRng.fill_bytes(&mut block);
            file.write_all(&block)
                .await
                .map_err(|e| StorageError::io(path, e))?;
            remaining = remaining.saturating_sub(block.len() as u64);
        }

        file.flush().await.map_err(|e| StorageError::io(path, e))?;
        file.sync_all().await.map_err(|e| StorageError::io(path, e))?;
    }
    drop(file);

    fs::remove_file(path).await.map_err(|e| StorageError::io(path, e))?;
    tracing::debug!(path = %path.display(), bytes = len, passes = SECURE_DELETE_PASSES, "File securely deleted");
    Ok(())
}

/// Secure-delete `path` if it exists, logging instead of failing.
///
/// Used on cleanup paths where the primary result must not be replaced.
pub async fn discard(path: &Path) {
    match fs::try_exists(path).await {
        Ok(false) => {}
        Ok(true) => {
            if let Err(e) = secure_delete(path).await {
                tracing::warn!(path = %path.display(), error = %e, "Cleanup of staged file failed");
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not check staged file for cleanup");
        }
    }
}

/// Every regular file below `root`. A missing root yields an empty list.
pub async fn walk_files(root: &Path) -> StorageResult<Vec<FileEntry>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StorageError::io(&dir, e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(|e| StorageError::io(&dir, e))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| StorageError::io(&path, e))?;

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let metadata = entry.metadata().await.map_err(|e| StorageError::io(&path, e))?;
                files.push(FileEntry {
                    path,
                    size: metadata.len(),
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                });
            }
        }
    }

    Ok(files)
}
