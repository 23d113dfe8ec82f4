use error_common::codes;
use error_common::{Categorized, ErrorCategory};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Master secret is not configured")]
    MasterSecretNotConfigured,

    #[error("Unsupported envelope version {found}, only version {supported} is supported")]
    UnsupportedEnvelopeVersion { found: String, supported: &'static str },

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Failed to unwrap document key")]
    KeyUnwrapFailed,

    #[error("Authentication tag mismatch: ciphertext or metadata was modified")]
    AuthenticationFailed,

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid envelope format: {0}")]
    InvalidFormat(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Payload transform '{name}' failed: {reason}")]
    Transform { name: &'static str, reason: String },
}

impl Categorized for CryptoError {
    fn category(&self) -> ErrorCategory {
        match self {
            CryptoError::MasterSecretNotConfigured => ErrorCategory::Configuration,
            _ => ErrorCategory::Envelope,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CryptoError::MasterSecretNotConfigured => codes::configuration::MASTER_SECRET_MISSING,
            CryptoError::UnsupportedEnvelopeVersion { .. } => codes::envelope::UNSUPPORTED_VERSION,
            CryptoError::UnsupportedAlgorithm(_) => codes::envelope::UNSUPPORTED_ALGORITHM,
            CryptoError::KeyUnwrapFailed => codes::envelope::KEY_UNWRAP_FAILED,
            CryptoError::AuthenticationFailed => codes::envelope::AUTHENTICATION_FAILED,
            CryptoError::DecryptionFailed(_) => codes::envelope::DECRYPTION_FAILED,
            CryptoError::InvalidFormat(_) => codes::envelope::MALFORMED,
            CryptoError::EncryptionFailed(_)
            | CryptoError::InvalidKeyLength { .. }
            | CryptoError::KeyDerivationFailed(_)
            | CryptoError::Transform { .. } => codes::envelope::CRYPTO_FAILURE,
        }
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
