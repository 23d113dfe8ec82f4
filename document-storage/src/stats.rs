use serde::{Deserialize, Serialize};

/// File count and byte total for one area of the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaStats {
    pub files: u64,
    pub bytes: u64,
}

impl AreaStats {
    pub fn record(&mut self, bytes: u64) {
        self.files += 1;
        self.bytes += bytes;
    }
}

/// Aggregate usage. Advisory only; taken without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub encrypted: AreaStats,
    pub public: AreaStats,
    pub temp: AreaStats,
    pub backups: AreaStats,
}

impl StorageStats {
    /// Files across all areas, backups included.
    pub fn total_files(&self) -> u64 {
        self.encrypted.files + self.public.files + self.temp.files + self.backups.files
    }

    pub fn total_bytes(&self) -> u64 {
        self.encrypted.bytes + self.public.bytes + self.temp.bytes + self.backups.bytes
    }

    /// Documents at their final location.
    pub fn stored_documents(&self) -> u64 {
        self.encrypted.files + self.public.files
    }
}
