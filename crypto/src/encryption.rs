use crate::aes_cbc::AesCbcCipher;
use crate::aes_gcm::Aes256GcmCipher;
use crate::error::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ciphers an envelope can be sealed with.
///
/// The identifier is written into every envelope, so existing variants and
/// their string forms must never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// AES-256-GCM
    #[serde(rename = "aead-256")]
    Aead256,
    /// AES-256-CBC with PKCS#7 padding
    #[serde(rename = "cbc-256")]
    Cbc256,
    /// AES-128-CBC with PKCS#7 padding
    #[serde(rename = "cbc-128")]
    Cbc128,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Aead256, Algorithm::Cbc256, Algorithm::Cbc128];

    pub fn id(&self) -> &'static str {
        match self {
            Algorithm::Aead256 => "aead-256",
            Algorithm::Cbc256 => "cbc-256",
            Algorithm::Cbc128 => "cbc-128",
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            Algorithm::Aead256 | Algorithm::Cbc256 => 32,
            Algorithm::Cbc128 => 16,
        }
    }

    pub fn iv_len(&self) -> usize {
        match self {
            Algorithm::Aead256 => 12,
            Algorithm::Cbc256 | Algorithm::Cbc128 => 16,
        }
    }

    /// Authenticated modes carry a tag and bind additional data.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Algorithm::Aead256)
    }

    pub fn cipher(&self) -> Box<dyn DocumentCipher> {
        match self {
            Algorithm::Aead256 => Box::new(Aes256GcmCipher),
            Algorithm::Cbc256 => Box::new(AesCbcCipher::aes256()),
            Algorithm::Cbc128 => Box::new(AesCbcCipher::aes128()),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aead-256" => Ok(Algorithm::Aead256),
            "cbc-256" => Ok(Algorithm::Cbc256),
            "cbc-128" => Ok(Algorithm::Cbc128),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Output of a single seal operation.
#[derive(Debug, Clone)]
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    /// Present only for authenticated algorithms.
    pub tag: Option<Vec<u8>>,
}

/// Symmetric cipher used for document payloads.
///
/// The IV is always supplied by the caller and always bound into the cipher.
pub trait DocumentCipher: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Encrypt `plaintext`. `aad` is ignored by unauthenticated modes.
    fn seal(&self, key: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> CryptoResult<SealedPayload>;

    /// Decrypt. Authenticated modes fail with [`CryptoError::AuthenticationFailed`]
    /// on any tag mismatch.
    fn open(
        &self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        tag: Option<&[u8]>,
        aad: &[u8],
    ) -> CryptoResult<Vec<u8>>;
}

pub(crate) fn check_len(expected: usize, got: usize) -> CryptoResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(CryptoError::InvalidKeyLength { expected, got })
    }
}
