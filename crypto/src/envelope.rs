use crate::aes_gcm::Aes256GcmCipher;
use crate::config::{EncryptOptions, KdfSettings};
use crate::encryption::Algorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::integrity;
use crate::kdf::{Kdf, KEY_LEN};
use crate::transforms::{GzipCompressor, PayloadTransform, TrailerWatermark};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Envelope format version written by this engine.
///
/// Version 2.0 binds the stored IV into every cipher call and authenticates
/// the envelope header for every algorithm.
pub const ENVELOPE_VERSION: &str = "2.0";

const SALT_LEN: usize = 16;
const WRAP_IV_LEN: usize = 12;
const WRAP_INFO: &[u8] = b"docvault/key-wrap";

/// Who a document belongs to and what it is.
///
/// Feeds master-key derivation and the authenticated envelope header, so
/// ciphertext cannot be rebound to another owner or category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    pub owner_id: u64,
    pub document_type: String,
}

impl DocumentContext {
    pub fn new(owner_id: u64, document_type: impl Into<String>) -> Self {
        Self {
            owner_id,
            document_type: document_type.into(),
        }
    }
}

/// Plaintext metadata stored next to the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    pub owner_id: u64,
    pub document_type: String,
    pub encrypted_at_utc: DateTime<Utc>,
    pub original_size: u64,
    pub compressed: bool,
    pub watermarked: bool,
}

/// Self-describing encrypted document as persisted at its final path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionEnvelope {
    pub version: String,
    /// Kept as a string so unknown ids surface as `UnsupportedAlgorithm`
    /// instead of a parse error.
    pub algorithm: String,
    #[serde(with = "hex::serde")]
    pub salt: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub iv: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_option")]
    pub auth_tag: Option<Vec<u8>>,
    /// HMAC-SHA256 over header and ciphertext, for unauthenticated algorithms only.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_option")]
    pub mac: Option<Vec<u8>>,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
    pub metadata: EnvelopeMetadata,
}

/// Every envelope field except the ciphertext and its tags, plus the caller's context.
///
/// Used as GCM additional data and as the MAC prefix, so editing the version,
/// algorithm, salt, IV or any metadata field fails authentication.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeHeader<'a> {
    owner_id: u64,
    document_type: &'a str,
    version: &'a str,
    algorithm: &'a str,
    salt: String,
    iv: String,
    metadata: &'a EnvelopeMetadata,
}

fn envelope_header(
    context: &DocumentContext,
    version: &str,
    algorithm: &str,
    salt: &[u8],
    iv: &[u8],
    metadata: &EnvelopeMetadata,
) -> CryptoResult<Vec<u8>> {
    serde_json::to_vec(&EnvelopeHeader {
        owner_id: context.owner_id,
        document_type: &context.document_type,
        version,
        algorithm,
        salt: hex::encode(salt),
        iv: hex::encode(iv),
        metadata,
    })
    .map_err(|e| CryptoError::InvalidFormat(e.to_string()))
}

impl EncryptionEnvelope {
    pub fn to_json_bytes(&self) -> CryptoResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CryptoError::InvalidFormat(e.to_string()))
    }

    pub fn from_json_slice(bytes: &[u8]) -> CryptoResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CryptoError::InvalidFormat(e.to_string()))
    }
}

/// Per-document key encrypted under the derived master key.
///
/// The engine never stores this. Callers persist it next to the document
/// reference; losing it makes the document unrecoverable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    #[serde(with = "hex::serde")]
    pub salt: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub iv: Vec<u8>,
    /// Wrapped key bytes followed by the GCM tag.
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

impl WrappedKey {
    pub fn to_json(&self) -> CryptoResult<String> {
        serde_json::to_string(self).map_err(|e| CryptoError::InvalidFormat(e.to_string()))
    }

    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::InvalidFormat(e.to_string()))
    }
}

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedKey")
            .field("salt", &hex::encode(&self.salt))
            .field("iv", &hex::encode(&self.iv))
            .field("data", &format_args!("[{} bytes]", self.data.len()))
            .finish()
    }
}

/// Result of sealing one document.
#[derive(Debug, Clone)]
pub struct SealedDocument {
    pub envelope: EncryptionEnvelope,
    pub wrapped_key: WrappedKey,
}

/// Envelope encryption for stored documents
///
/// 1. Derive a master key from the server secret and `(owner, document type)`
/// 2. Generate a random per-document key
/// 3. Compress and watermark the plaintext if requested
/// 4. Encrypt under a data key expanded from the document key and a fresh salt
/// 5. Wrap the document key under the master key
///
/// Only the master secret lives in the engine. Master keys are re-derived on
/// every call and document keys leave only in wrapped form.
pub struct EnvelopeEngine {
    secret: SecretString,
    kdf: KdfSettings,
    compressor: Box<dyn PayloadTransform>,
    watermarker: Box<dyn PayloadTransform>,
}

impl fmt::Debug for EnvelopeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeEngine")
            .field("secret", &"[REDACTED]")
            .field("kdf", &self.kdf)
            .field("compressor", &self.compressor.name())
            .field("watermarker", &self.watermarker.name())
            .finish()
    }
}

impl EnvelopeEngine {
    /// Create an engine around the server-held master secret.
    ///
    /// # Errors
    /// [`CryptoError::MasterSecretNotConfigured`] if the secret is empty.
    pub fn new(secret: SecretString, kdf: KdfSettings) -> CryptoResult<Self> {
        if secret.expose_secret().trim().is_empty() {
            return Err(CryptoError::MasterSecretNotConfigured);
        }

        Ok(Self {
            secret,
            kdf,
            compressor: Box::new(GzipCompressor::default()),
            watermarker: Box::new(TrailerWatermark::default()),
        })
    }

    pub fn with_compressor(mut self, compressor: impl PayloadTransform + 'static) -> Self {
        self.compressor = Box::new(compressor);
        self
    }

    pub fn with_watermarker(mut self, watermarker: impl PayloadTransform + 'static) -> Self {
        self.watermarker = Box::new(watermarker);
        self
    }

    pub fn kdf_settings(&self) -> &KdfSettings {
        &self.kdf
    }

    /// Encrypt a validated document.
    ///
    /// # Errors
    /// Transform, key derivation or cipher failures.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        context: &DocumentContext,
        algorithm: Algorithm,
        options: EncryptOptions,
    ) -> CryptoResult<SealedDocument> {
        let master_key = self.master_key(context, algorithm)?;
        let document_key = Kdf::generate_key(KEY_LEN);

        let mut payload = plaintext.to_vec();
        if options.compress {
            payload = self.compressor.apply(payload, context)?;
        }
        if options.watermark {
            payload = self.watermarker.apply(payload, context)?;
        }

        let salt = Kdf::generate_salt(SALT_LEN);
        let iv = Kdf::generate_salt(algorithm.iv_len());
        let metadata = EnvelopeMetadata {
            owner_id: context.owner_id,
            document_type: context.document_type.clone(),
            encrypted_at_utc: Utc::now(),
            original_size: plaintext.len() as u64,
            compressed: options.compress,
            watermarked: options.watermark,
        };
        let header = envelope_header(context, ENVELOPE_VERSION, algorithm.id(), &salt, &iv, &metadata)?;

        let data_key = Self::data_key(&document_key, &salt, algorithm)?;
        let sealed = algorithm.cipher().seal(&data_key, &iv, &payload, &header)?;
        let mac = if algorithm.is_authenticated() {
            None
        } else {
            let mac_key = Self::mac_key(&document_key, &salt, algorithm)?;
            Some(integrity::compute(&mac_key, &header, &sealed.ciphertext)?)
        };

        let wrapped_key = Self::wrap_key(&master_key, &document_key)?;

        tracing::debug!(
            owner_id = context.owner_id,
            document_type = %context.document_type,
            algorithm = %algorithm,
            original_size = plaintext.len(),
            sealed_size = sealed.ciphertext.len(),
            "Document sealed"
        );

        Ok(SealedDocument {
            envelope: EncryptionEnvelope {
                version: ENVELOPE_VERSION.to_string(),
                algorithm: algorithm.id().to_string(),
                salt,
                iv,
                auth_tag: sealed.tag,
                mac,
                data: sealed.ciphertext,
                metadata,
            },
            wrapped_key,
        })
    }

    /// Decrypt an envelope with the caller-held wrapped key.
    ///
    /// # Errors
    /// - [`CryptoError::UnsupportedEnvelopeVersion`] for any version but [`ENVELOPE_VERSION`]
    /// - [`CryptoError::KeyUnwrapFailed`] for a wrong owner/type/secret or tampered wrapped key
    /// - [`CryptoError::AuthenticationFailed`] for a tampered header, ciphertext, tag or MAC
    /// - [`CryptoError::DecryptionFailed`] if the recovered document is not `originalSize` bytes
    pub fn decrypt(
        &self,
        envelope: &EncryptionEnvelope,
        wrapped_key: &WrappedKey,
        context: &DocumentContext,
    ) -> CryptoResult<Vec<u8>> {
        if envelope.version != ENVELOPE_VERSION {
            return Err(CryptoError::UnsupportedEnvelopeVersion {
                found: envelope.version.clone(),
                supported: ENVELOPE_VERSION,
            });
        }
        let algorithm: Algorithm = envelope.algorithm.parse()?;

        let master_key = self.master_key(context, algorithm)?;
        let document_key = Self::unwrap_key(&master_key, wrapped_key)?;
        let header = envelope_header(
            context,
            &envelope.version,
            &envelope.algorithm,
            &envelope.salt,
            &envelope.iv,
            &envelope.metadata,
        )?;

        if !algorithm.is_authenticated() {
            let mac_key = Self::mac_key(&document_key, &envelope.salt, algorithm)?;
            integrity::verify(&mac_key, &header, &envelope.data, envelope.mac.as_deref())?;
        }

        let data_key = Self::data_key(&document_key, &envelope.salt, algorithm)?;
        let mut payload = algorithm.cipher().open(
            &data_key,
            &envelope.iv,
            &envelope.data,
            envelope.auth_tag.as_deref(),
            &header,
        )?;

        if envelope.metadata.watermarked {
            payload = self.watermarker.reverse(payload, context)?;
        }
        if envelope.metadata.compressed {
            payload = self.compressor.reverse(payload, context)?;
        }
        if payload.len() as u64 != envelope.metadata.original_size {
            return Err(CryptoError::DecryptionFailed(format!(
                "recovered {} bytes, envelope records {}",
                payload.len(),
                envelope.metadata.original_size
            )));
        }

        tracing::debug!(
            owner_id = context.owner_id,
            document_type = %context.document_type,
            algorithm = %algorithm,
            "Document opened"
        );

        Ok(payload)
    }

    fn master_key(&self, context: &DocumentContext, algorithm: Algorithm) -> CryptoResult<Zeroizing<Vec<u8>>> {
        Kdf::derive_master_key(
            self.secret.expose_secret().as_bytes(),
            &self.kdf.salt_label,
            context.owner_id,
            &context.document_type,
            self.kdf.iterations_for(algorithm),
        )
    }

    fn data_key(document_key: &[u8], salt: &[u8], algorithm: Algorithm) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let info = format!("docvault/data/{algorithm}");
        Kdf::hkdf(document_key, salt, info.as_bytes(), algorithm.key_len())
    }

    fn mac_key(document_key: &[u8], salt: &[u8], algorithm: Algorithm) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let info = format!("docvault/mac/{algorithm}");
        Kdf::hkdf(document_key, salt, info.as_bytes(), integrity::MAC_LEN)
    }

    fn wrap_key(master_key: &[u8], document_key: &[u8]) -> CryptoResult<WrappedKey> {
        let salt = Kdf::generate_salt(SALT_LEN);
        let iv = Kdf::generate_salt(WRAP_IV_LEN);
        let wrapping_key = Kdf::hkdf(master_key, &salt, WRAP_INFO, KEY_LEN)?;
        let data = Aes256GcmCipher::seal_combined(&wrapping_key, &iv, document_key, WRAP_INFO)?;

        Ok(WrappedKey { salt, iv, data })
    }

    fn unwrap_key(master_key: &[u8], wrapped: &WrappedKey) -> CryptoResult<Zeroizing<Vec<u8>>> {
        if wrapped.iv.len() != WRAP_IV_LEN {
            return Err(CryptoError::KeyUnwrapFailed);
        }
        let wrapping_key = Kdf::hkdf(master_key, &wrapped.salt, WRAP_INFO, KEY_LEN)?;
        let document_key = Aes256GcmCipher::open_combined(&wrapping_key, &wrapped.iv, &wrapped.data, WRAP_INFO)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::KeyUnwrapFailed)?;

        if document_key.len() != KEY_LEN {
            return Err(CryptoError::KeyUnwrapFailed);
        }
        Ok(document_key)
    }
}

mod hex_option {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| hex::decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::IdentityTransform;
    use proptest::prelude::*;

    fn engine() -> EnvelopeEngine {
        EnvelopeEngine::new(SecretString::new("test-master-secret".to_string()), KdfSettings::uniform(1_000))
            .unwrap()
    }

    fn context() -> DocumentContext {
        DocumentContext::new(7, "identity_card")
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        let result = EnvelopeEngine::new(SecretString::new("  ".to_string()), KdfSettings::uniform(1_000));
        assert!(matches!(result, Err(CryptoError::MasterSecretNotConfigured)));
    }

    #[test]
    fn test_roundtrip_every_algorithm_and_option() {
        let engine = engine();
        let plaintext = b"scanned identity card front and back".repeat(50);

        for algorithm in Algorithm::ALL {
            for (compress, watermark) in [(false, false), (true, false), (false, true), (true, true)] {
                let sealed = engine
                    .encrypt(&plaintext, &context(), algorithm, EncryptOptions::new(compress, watermark))
                    .unwrap();
                assert_eq!(sealed.envelope.algorithm, algorithm.id());
                assert_eq!(sealed.envelope.auth_tag.is_some(), algorithm.is_authenticated());

                let opened = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context()).unwrap();
                assert_eq!(opened, plaintext, "{algorithm} compress={compress} watermark={watermark}");
            }
        }
    }

    #[test]
    fn test_identity_transforms_keep_roundtrip() {
        let engine = engine()
            .with_compressor(IdentityTransform)
            .with_watermarker(IdentityTransform);
        let sealed = engine
            .encrypt(b"photo bytes", &context(), Algorithm::Aead256, EncryptOptions::new(true, true))
            .unwrap();

        assert!(sealed.envelope.metadata.compressed);
        assert_eq!(engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context()).unwrap(), b"photo bytes");
    }

    #[test]
    fn test_metadata_describes_document() {
        let sealed = engine()
            .encrypt(b"12345", &context(), Algorithm::Cbc256, EncryptOptions::new(true, false))
            .unwrap();

        let metadata = &sealed.envelope.metadata;
        assert_eq!(metadata.owner_id, 7);
        assert_eq!(metadata.document_type, "identity_card");
        assert_eq!(metadata.original_size, 5);
        assert!(metadata.compressed);
        assert!(!metadata.watermarked);
        assert_eq!(sealed.envelope.version, ENVELOPE_VERSION);
    }

    #[test]
    fn test_envelope_json_shape() {
        let sealed = engine()
            .encrypt(b"data", &context(), Algorithm::Aead256, EncryptOptions::default())
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&sealed.envelope.to_json_bytes().unwrap()).unwrap();

        assert_eq!(json["version"], "2.0");
        assert_eq!(json["algorithm"], "aead-256");
        assert!(json["authTag"].is_string());
        assert!(json.get("mac").is_none());
        assert!(json["metadata"]["encryptedAtUtc"].is_string());
        assert_eq!(json["metadata"]["ownerId"], 7);
        assert_eq!(json["iv"].as_str().map(str::len), Some(24));

        let cbc = engine()
            .encrypt(b"data", &context(), Algorithm::Cbc128, EncryptOptions::default())
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&cbc.envelope.to_json_bytes().unwrap()).unwrap();
        assert!(json.get("authTag").is_none());
        assert_eq!(json["mac"].as_str().map(str::len), Some(64));
    }

    #[test]
    fn test_edited_header_fields_fail_authentication() {
        let engine = engine();
        let edits: [fn(&mut EncryptionEnvelope); 7] = [
            |e| e.metadata.compressed = !e.metadata.compressed,
            |e| e.metadata.watermarked = !e.metadata.watermarked,
            |e| e.metadata.original_size += 1,
            |e| e.metadata.encrypted_at_utc -= chrono::Duration::seconds(1),
            |e| e.metadata.owner_id += 1,
            |e| e.metadata.document_type = "rental_contract".to_string(),
            |e| e.salt[0] ^= 0x01,
        ];

        for algorithm in Algorithm::ALL {
            for (index, edit) in edits.iter().enumerate() {
                let mut sealed = engine
                    .encrypt(&[42u8; 4096], &context(), algorithm, EncryptOptions::new(true, true))
                    .unwrap();
                edit(&mut sealed.envelope);

                let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
                assert!(
                    matches!(result, Err(CryptoError::AuthenticationFailed)),
                    "{algorithm} edit #{index}: {result:?}"
                );
            }
        }
    }

    #[test]
    fn test_unauthenticated_modes_detect_ciphertext_changes() {
        let engine = engine();
        for algorithm in [Algorithm::Cbc256, Algorithm::Cbc128] {
            let mut sealed = engine
                .encrypt(&[1u8; 300], &context(), algorithm, EncryptOptions::new(false, false))
                .unwrap();
            sealed.envelope.data[100] ^= 0x01;
            let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
            assert!(matches!(result, Err(CryptoError::AuthenticationFailed)), "{algorithm}");

            sealed.envelope.data[100] ^= 0x01;
            sealed.envelope.iv[0] ^= 0x01;
            let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
            assert!(matches!(result, Err(CryptoError::AuthenticationFailed)), "{algorithm}");
        }
    }

    #[test]
    fn test_missing_mac_on_unauthenticated_envelope() {
        let engine = engine();
        let mut sealed = engine
            .encrypt(b"data", &context(), Algorithm::Cbc256, EncryptOptions::default())
            .unwrap();
        sealed.envelope.mac = None;

        let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    struct DropLastByte;

    impl PayloadTransform for DropLastByte {
        fn name(&self) -> &'static str {
            "drop-last-byte"
        }

        fn apply(&self, data: Vec<u8>, _context: &DocumentContext) -> CryptoResult<Vec<u8>> {
            Ok(data)
        }

        fn reverse(&self, mut data: Vec<u8>, _context: &DocumentContext) -> CryptoResult<Vec<u8>> {
            data.pop();
            Ok(data)
        }
    }

    #[test]
    fn test_recovered_size_must_match_metadata() {
        let engine = engine().with_compressor(DropLastByte);
        let sealed = engine
            .encrypt(b"lease agreement", &context(), Algorithm::Aead256, EncryptOptions::new(true, false))
            .unwrap();

        let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_envelope_and_wrapped_key_survive_serialization() {
        let engine = engine();
        let sealed = engine
            .encrypt(b"deed", &context(), Algorithm::Aead256, EncryptOptions::new(true, true))
            .unwrap();

        let envelope = EncryptionEnvelope::from_json_slice(&sealed.envelope.to_json_bytes().unwrap()).unwrap();
        let wrapped = WrappedKey::from_json(&sealed.wrapped_key.to_json().unwrap()).unwrap();
        assert_eq!(envelope, sealed.envelope);
        assert_eq!(engine.decrypt(&envelope, &wrapped, &context()).unwrap(), b"deed");
    }

    #[test]
    fn test_unsupported_version() {
        let engine = engine();
        let mut sealed = engine
            .encrypt(b"data", &context(), Algorithm::Aead256, EncryptOptions::default())
            .unwrap();
        sealed.envelope.version = "1.0".to_string();

        let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
        assert!(matches!(result, Err(CryptoError::UnsupportedEnvelopeVersion { .. })));
    }

    #[test]
    fn test_unknown_algorithm() {
        let engine = engine();
        let mut sealed = engine
            .encrypt(b"data", &context(), Algorithm::Aead256, EncryptOptions::default())
            .unwrap();
        sealed.envelope.algorithm = "rot13".to_string();

        let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
        assert!(matches!(result, Err(CryptoError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_wrong_owner_cannot_unwrap() {
        let engine = engine();
        let sealed = engine
            .encrypt(b"data", &context(), Algorithm::Aead256, EncryptOptions::default())
            .unwrap();

        let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &DocumentContext::new(8, "identity_card"));
        assert!(matches!(result, Err(CryptoError::KeyUnwrapFailed)));
    }

    #[test]
    fn test_wrong_secret_cannot_unwrap() {
        let sealed = engine()
            .encrypt(b"data", &context(), Algorithm::Cbc256, EncryptOptions::default())
            .unwrap();
        let other = EnvelopeEngine::new(SecretString::new("other-secret".to_string()), KdfSettings::uniform(1_000))
            .unwrap();

        let result = other.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
        assert!(matches!(result, Err(CryptoError::KeyUnwrapFailed)));
    }

    #[test]
    fn test_tampered_wrapped_key() {
        let engine = engine();
        let mut sealed = engine
            .encrypt(b"data", &context(), Algorithm::Aead256, EncryptOptions::default())
            .unwrap();
        sealed.wrapped_key.data[0] ^= 0xFF;

        let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
        assert!(matches!(result, Err(CryptoError::KeyUnwrapFailed)));
    }

    #[test]
    fn test_missing_tag_on_authenticated_envelope() {
        let engine = engine();
        let mut sealed = engine
            .encrypt(b"data", &context(), Algorithm::Aead256, EncryptOptions::default())
            .unwrap();
        sealed.envelope.auth_tag = None;

        let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn test_fresh_keys_and_ivs_per_document() {
        let engine = engine();
        let a = engine.encrypt(b"same", &context(), Algorithm::Aead256, EncryptOptions::default()).unwrap();
        let b = engine.encrypt(b"same", &context(), Algorithm::Aead256, EncryptOptions::default()).unwrap();

        assert_ne!(a.envelope.iv, b.envelope.iv);
        assert_ne!(a.envelope.data, b.envelope.data);
        assert_ne!(a.wrapped_key, b.wrapped_key);
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let engine = engine();
        let sealed = engine.encrypt(b"data", &context(), Algorithm::Aead256, EncryptOptions::default()).unwrap();

        assert!(!format!("{engine:?}").contains("test-master-secret"));
        assert!(!format!("{:?}", sealed.wrapped_key).contains(&hex::encode(&sealed.wrapped_key.data)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_tampering_is_detected(
            payload in proptest::collection::vec(any::<u8>(), 1..512),
            algorithm in prop::sample::select(Algorithm::ALL.to_vec()),
            position in any::<prop::sample::Index>(),
            flip in 1u8..=255,
            in_tag in any::<bool>(),
        ) {
            let engine = engine();
            let mut sealed = engine
                .encrypt(&payload, &context(), algorithm, EncryptOptions::default())
                .unwrap();

            if in_tag {
                let envelope = &mut sealed.envelope;
                let tag = envelope.auth_tag.as_mut().or(envelope.mac.as_mut()).unwrap();
                let index = position.index(tag.len());
                tag[index] ^= flip;
            } else {
                let index = position.index(sealed.envelope.data.len());
                sealed.envelope.data[index] ^= flip;
            }

            let result = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context());
            prop_assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
        }

        #[test]
        fn prop_roundtrip_any_payload(
            payload in proptest::collection::vec(any::<u8>(), 0..2048),
            algorithm in prop::sample::select(Algorithm::ALL.to_vec()),
            compress in any::<bool>(),
            watermark in any::<bool>(),
        ) {
            let engine = engine();
            let sealed = engine
                .encrypt(&payload, &context(), algorithm, EncryptOptions::new(compress, watermark))
                .unwrap();
            let opened = engine.decrypt(&sealed.envelope, &sealed.wrapped_key, &context()).unwrap();
            prop_assert_eq!(opened, payload);
        }
    }
}
