//! Envelope encryption engine for stored documents
//!
//! - Master keys derived with PBKDF2-HMAC-SHA256 from a server secret and the
//!   `(owner, document type)` pair, never persisted
//! - Random per-document keys, returned to the caller only in wrapped form
//! - AES-256-GCM for the highest tier, AES-CBC with HMAC-SHA256 for lower tiers
//! - Envelope header (version, algorithm, salt, IV, metadata) authenticated in every mode
//! - Optional gzip compression and watermarking ahead of encryption
//! - Self-describing, versioned JSON envelopes
//!
//! # Example
//!
//! ```rust
//! use crypto::{Algorithm, DocumentContext, EncryptOptions, EnvelopeEngine, KdfSettings};
//! use secrecy::SecretString;
//!
//! let engine = EnvelopeEngine::new(
//!     SecretString::new("server-master-secret".to_string()),
//!     KdfSettings::uniform(1_000),
//! )?;
//! let context = DocumentContext::new(7, "identity_card");
//!
//! let sealed = engine.encrypt(b"scan", &context, Algorithm::Aead256, EncryptOptions::new(true, true))?;
//! let plaintext = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context)?;
//! assert_eq!(plaintext, b"scan");
//! # Ok::<(), crypto::CryptoError>(())
//! ```

pub mod aes_cbc;
pub mod aes_gcm;
pub mod config;
pub mod encryption;
pub mod envelope;
pub mod error;
pub mod hashing;
pub mod integrity;
pub mod kdf;
pub mod transforms;

pub use config::{EncryptOptions, KdfSettings};
pub use encryption::{Algorithm, DocumentCipher, SealedPayload};
pub use envelope::{
    DocumentContext, EncryptionEnvelope, EnvelopeEngine, EnvelopeMetadata, SealedDocument, WrappedKey,
    ENVELOPE_VERSION,
};
pub use error::{CryptoError, CryptoResult};
pub use hashing::content_hash;
pub use transforms::{GzipCompressor, IdentityTransform, PayloadTransform, TrailerWatermark};
