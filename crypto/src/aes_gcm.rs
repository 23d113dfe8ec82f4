use crate::encryption::{check_len, Algorithm, DocumentCipher, SealedPayload};
use crate::error::{CryptoError, CryptoResult};
use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};

/// Length of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// AES-256 in Galois/Counter Mode with detached tags.
///
/// - 96-bit nonces (recommended for GCM)
/// - 128-bit authentication tags
/// - Any tag mismatch surfaces as [`CryptoError::AuthenticationFailed`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256GcmCipher;

impl Aes256GcmCipher {
    fn cipher(key: &[u8]) -> CryptoResult<Aes256Gcm> {
        check_len(Algorithm::Aead256.key_len(), key.len())?;
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            got: key.len(),
        })
    }

    /// Seal with the tag appended to the ciphertext. Used for wrapping keys.
    pub fn seal_combined(key: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
        let sealed = Self.seal(key, iv, plaintext, aad)?;
        let mut combined = sealed.ciphertext;
        combined.extend_from_slice(&sealed.tag.unwrap_or_default());
        Ok(combined)
    }

    /// Open a ciphertext produced by [`Aes256GcmCipher::seal_combined`].
    pub fn open_combined(key: &[u8], iv: &[u8], combined: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
        let split = combined
            .len()
            .checked_sub(TAG_LEN)
            .ok_or(CryptoError::AuthenticationFailed)?;
        let (ciphertext, tag) = combined.split_at(split);
        Self.open(key, iv, ciphertext, Some(tag), aad)
    }
}

impl DocumentCipher for Aes256GcmCipher {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Aead256
    }

    fn seal(&self, key: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> CryptoResult<SealedPayload> {
        check_len(Algorithm::Aead256.iv_len(), iv.len())?;
        let cipher = Self::cipher(key)?;

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer)
            .map_err(|_| CryptoError::EncryptionFailed("AES-256-GCM seal failed".to_string()))?;

        Ok(SealedPayload {
            ciphertext: buffer,
            tag: Some(tag.to_vec()),
        })
    }

    fn open(
        &self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        tag: Option<&[u8]>,
        aad: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        check_len(Algorithm::Aead256.iv_len(), iv.len())
            .map_err(|_| CryptoError::InvalidFormat(format!("GCM IV must be 12 bytes, got {}", iv.len())))?;
        let tag = match tag {
            Some(tag) if tag.len() == TAG_LEN => Tag::from_slice(tag),
            _ => return Err(CryptoError::AuthenticationFailed),
        };
        let cipher = Self::cipher(key)?;

        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer, tag)
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        Ok(buffer)
    }
}
