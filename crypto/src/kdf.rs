use crate::error::{CryptoError, CryptoResult};
use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of every key the engine derives or generates, in bytes.
pub const KEY_LEN: usize = 32;

/// Default label mixed into the master-key salt.
///
/// Re-derivation at decrypt time depends on this value staying stable for the
/// lifetime of the stored documents.
pub const DEFAULT_SALT_LABEL: &str = "docvault-master-key-v2";

/// Key Derivation Function utilities
pub struct Kdf;

impl Kdf {
    /// Derive a key using PBKDF2-HMAC-SHA256
    ///
    /// # Arguments
    /// * `password` - The secret to derive from
    /// * `salt` - Salt for key derivation
    /// * `iterations` - Work factor (higher = slower)
    /// * `key_length` - Length of derived key in bytes
    pub fn pbkdf2(
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        key_length: usize,
    ) -> CryptoResult<Zeroizing<Vec<u8>>> {
        if iterations == 0 {
            return Err(CryptoError::KeyDerivationFailed(
                "PBKDF2 iteration count must be positive".to_string(),
            ));
        }

        let mut derived_key = Zeroizing::new(vec![0u8; key_length]);
        pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut derived_key);

        Ok(derived_key)
    }

    /// HKDF (HMAC-based Key Derivation Function) - RFC 5869
    ///
    /// Used to expand a high-entropy key into purpose-bound subkeys.
    pub fn hkdf(
        ikm: &[u8],
        salt: &[u8],
        info: &[u8],
        length: usize,
    ) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
        let mut okm = Zeroizing::new(vec![0u8; length]);

        hkdf.expand(info, &mut okm).map_err(|_| {
            CryptoError::KeyDerivationFailed(format!("HKDF cannot produce {length} bytes"))
        })?;

        Ok(okm)
    }

    /// Derive the master key for one `(owner, document type)` pair.
    ///
    /// Deterministic: the same secret, label, owner, type and work factor always
    /// produce the same key. Nothing derived here is ever persisted.
    pub fn derive_master_key(
        secret: &[u8],
        salt_label: &str,
        owner_id: u64,
        document_type: &str,
        iterations: u32,
    ) -> CryptoResult<Zeroizing<Vec<u8>>> {
        if secret.is_empty() {
            return Err(CryptoError::MasterSecretNotConfigured);
        }

        let salt = format!("{salt_label}:{owner_id}:{document_type}");
        Self::pbkdf2(secret, salt.as_bytes(), iterations, KEY_LEN)
    }

    /// Generate a cryptographically secure random salt
    pub fn generate_salt(length: usize) -> Vec<u8> {
        let mut salt = vec![0u8; length];
        rand::thread_rng().fill_bytes(&mut salt);
        salt
    }

    /// Fresh random key material, zeroized on drop.
    pub fn generate_key(length: usize) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; length]);
        rand::thread_rng().fill_bytes(&mut key);
        key
    }
}
