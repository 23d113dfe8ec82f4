use crate::encryption::{check_len, Algorithm, DocumentCipher, SealedPayload};
use crate::error::{CryptoError, CryptoResult};
use aes::{Aes128, Aes256};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-CBC with PKCS#7 padding.
///
/// Unauthenticated on its own: a modified ciphertext either fails padding checks
/// with [`CryptoError::DecryptionFailed`] or decrypts to garbage. The envelope
/// engine pairs it with an HMAC checked before [`DocumentCipher::open`].
#[derive(Debug, Clone, Copy)]
pub struct AesCbcCipher {
    algorithm: Algorithm,
}

impl AesCbcCipher {
    pub fn aes256() -> Self {
        Self {
            algorithm: Algorithm::Cbc256,
        }
    }

    pub fn aes128() -> Self {
        Self {
            algorithm: Algorithm::Cbc128,
        }
    }

    fn check(&self, key: &[u8], iv: &[u8]) -> CryptoResult<()> {
        check_len(self.algorithm.key_len(), key.len())?;
        check_len(self.algorithm.iv_len(), iv.len())
            .map_err(|_| CryptoError::InvalidFormat(format!("CBC IV must be 16 bytes, got {}", iv.len())))
    }
}

fn invalid_length(_: cbc::cipher::InvalidLength) -> CryptoError {
    CryptoError::EncryptionFailed("invalid CBC key or IV length".to_string())
}

impl DocumentCipher for AesCbcCipher {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn seal(&self, key: &[u8], iv: &[u8], plaintext: &[u8], _aad: &[u8]) -> CryptoResult<SealedPayload> {
        self.check(key, iv)?;

        let ciphertext = match self.algorithm {
            Algorithm::Cbc128 => Aes128CbcEnc::new_from_slices(key, iv)
                .map_err(invalid_length)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            _ => Aes256CbcEnc::new_from_slices(key, iv)
                .map_err(invalid_length)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        };

        Ok(SealedPayload { ciphertext, tag: None })
    }

    fn open(
        &self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        _tag: Option<&[u8]>,
        _aad: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        self.check(key, iv)?;

        let result = match self.algorithm {
            Algorithm::Cbc128 => Aes128CbcDec::new_from_slices(key, iv)
                .map_err(invalid_length)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            _ => Aes256CbcDec::new_from_slices(key, iv)
                .map_err(invalid_length)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        };

        result.map_err(|_| CryptoError::DecryptionFailed(format!("{} padding check failed", self.algorithm)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::Kdf;

    #[test]
    fn test_roundtrip_both_key_sizes() {
        for cipher in [AesCbcCipher::aes256(), AesCbcCipher::aes128()] {
            let key = Kdf::generate_key(cipher.algorithm().key_len());
            let iv = Kdf::generate_salt(16);

            let sealed = cipher.seal(&key, &iv, b"committee minutes", b"").unwrap();
            assert!(sealed.tag.is_none());
            // PKCS#7 always pads to the next full block
            assert_eq!(sealed.ciphertext.len(), 32);

            let opened = cipher.open(&key, &iv, &sealed.ciphertext, None, b"").unwrap();
            assert_eq!(opened, b"committee minutes");
        }
    }

    #[test]
    fn test_iv_changes_ciphertext() {
        let cipher = AesCbcCipher::aes256();
        let key = Kdf::generate_key(32);

        let a = cipher.seal(&key, &Kdf::generate_salt(16), b"same", b"").unwrap();
        let b = cipher.seal(&key, &Kdf::generate_salt(16), b"same", b"").unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let cipher = AesCbcCipher::aes128();
        let key = Kdf::generate_key(16);
        let iv = Kdf::generate_salt(16);
        let sealed = cipher.seal(&key, &iv, b"some longer plaintext here", b"").unwrap();

        let result = cipher.open(&key, &iv, &sealed.ciphertext[..20], None, b"");
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_key_size_enforced() {
        let iv = Kdf::generate_salt(16);
        let result = AesCbcCipher::aes128().seal(&[0u8; 32], &iv, b"data", b"");
        assert!(matches!(result, Err(CryptoError::InvalidKeyLength { expected: 16, got: 32 })));
    }
}
