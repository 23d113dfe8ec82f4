//! Engine configuration
//!
//! Work factors are chosen per algorithm rather than per call, so an envelope's
//! algorithm id is enough to re-derive its master key at decrypt time.

use crate::encryption::Algorithm;
use crate::kdf::DEFAULT_SALT_LABEL;

/// PBKDF2 settings for master-key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfSettings {
    /// Label mixed into the master-key salt. Changing it makes every stored
    /// document unrecoverable.
    pub salt_label: String,
    pub aead_256_iterations: u32,
    pub cbc_256_iterations: u32,
    pub cbc_128_iterations: u32,
}

impl Default for KdfSettings {
    fn default() -> Self {
        Self {
            salt_label: DEFAULT_SALT_LABEL.to_string(),
            aead_256_iterations: 600_000, // OWASP 2023 recommendation
            cbc_256_iterations: 310_000,
            cbc_128_iterations: 100_000,
        }
    }
}

impl KdfSettings {
    /// Same work factor for every algorithm. Mostly useful in tests.
    pub fn uniform(iterations: u32) -> Self {
        Self {
            aead_256_iterations: iterations,
            cbc_256_iterations: iterations,
            cbc_128_iterations: iterations,
            ..Self::default()
        }
    }

    pub fn with_salt_label(mut self, label: impl Into<String>) -> Self {
        self.salt_label = label.into();
        self
    }

    pub fn iterations_for(&self, algorithm: Algorithm) -> u32 {
        match algorithm {
            Algorithm::Aead256 => self.aead_256_iterations,
            Algorithm::Cbc256 => self.cbc_256_iterations,
            Algorithm::Cbc128 => self.cbc_128_iterations,
        }
    }
}

/// Which pre-encryption transforms to apply to one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncryptOptions {
    pub compress: bool,
    pub watermark: bool,
}

impl EncryptOptions {
    pub fn new(compress: bool, watermark: bool) -> Self {
        Self { compress, watermark }
    }
}
