//! Reversible plaintext transforms applied before encryption.
//!
//! The engine applies compression first and watermarking second, and reverses
//! them in the opposite order after decryption. Either slot may hold an
//! [`IdentityTransform`] in builds that do not implement it.

use crate::envelope::DocumentContext;
use crate::error::{CryptoError, CryptoResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Trait for reversible payload transforms
pub trait PayloadTransform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, data: Vec<u8>, context: &DocumentContext) -> CryptoResult<Vec<u8>>;

    /// Must satisfy `reverse(apply(x)) == x` for every input.
    fn reverse(&self, data: Vec<u8>, context: &DocumentContext) -> CryptoResult<Vec<u8>>;
}

/// No-op transform
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl PayloadTransform for IdentityTransform {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn apply(&self, data: Vec<u8>, _context: &DocumentContext) -> CryptoResult<Vec<u8>> {
        Ok(data)
    }

    fn reverse(&self, data: Vec<u8>, _context: &DocumentContext) -> CryptoResult<Vec<u8>> {
        Ok(data)
    }
}

/// Gzip compression with an upper bound on inflated size.
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    level: u32,
    max_inflated_size: u64,
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self {
            level: 6,
            max_inflated_size: 64 * 1024 * 1024,
        }
    }
}

impl GzipCompressor {
    pub fn new(level: u32, max_inflated_size: u64) -> Self {
        Self {
            level: level.min(9),
            max_inflated_size,
        }
    }

    fn failure(reason: impl ToString) -> CryptoError {
        CryptoError::Transform {
            name: "gzip",
            reason: reason.to_string(),
        }
    }
}

impl PayloadTransform for GzipCompressor {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn apply(&self, data: Vec<u8>, _context: &DocumentContext) -> CryptoResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(self.level));
        encoder.write_all(&data).map_err(Self::failure)?;
        encoder.finish().map_err(Self::failure)
    }

    fn reverse(&self, data: Vec<u8>, _context: &DocumentContext) -> CryptoResult<Vec<u8>> {
        let mut inflated = Vec::new();
        GzDecoder::new(data.as_slice())
            .take(self.max_inflated_size.saturating_add(1))
            .read_to_end(&mut inflated)
            .map_err(Self::failure)?;

        if inflated.len() as u64 > self.max_inflated_size {
            return Err(Self::failure(format!(
                "inflated payload exceeds {} bytes",
                self.max_inflated_size
            )));
        }
        Ok(inflated)
    }
}

/// Appends a framed ownership marker to the payload.
///
/// Layout: `payload || marker || u32 BE marker length || "DVWM"`.
#[derive(Debug, Clone)]
pub struct TrailerWatermark {
    issuer: String,
}

const WATERMARK_MAGIC: &[u8; 4] = b"DVWM";

impl Default for TrailerWatermark {
    fn default() -> Self {
        Self::new("docvault")
    }
}

impl TrailerWatermark {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self { issuer: issuer.into() }
    }

    fn marker(&self, context: &DocumentContext) -> String {
        format!(
            "{}:owner={}:type={}",
            self.issuer, context.owner_id, context.document_type
        )
    }

    fn failure(reason: impl ToString) -> CryptoError {
        CryptoError::Transform {
            name: "watermark",
            reason: reason.to_string(),
        }
    }
}

impl PayloadTransform for TrailerWatermark {
    fn name(&self) -> &'static str {
        "watermark"
    }

    fn apply(&self, mut data: Vec<u8>, context: &DocumentContext) -> CryptoResult<Vec<u8>> {
        let marker = self.marker(context);
        let marker_len = u32::try_from(marker.len()).map_err(Self::failure)?;

        data.extend_from_slice(marker.as_bytes());
        data.extend_from_slice(&marker_len.to_be_bytes());
        data.extend_from_slice(WATERMARK_MAGIC);
        Ok(data)
    }

    fn reverse(&self, mut data: Vec<u8>, _context: &DocumentContext) -> CryptoResult<Vec<u8>> {
        let frame_start = data
            .len()
            .checked_sub(8)
            .ok_or_else(|| Self::failure("payload shorter than watermark frame"))?;
        let (body, frame) = data.split_at(frame_start);
        let (len_bytes, magic) = frame.split_at(4);
        if magic != WATERMARK_MAGIC {
            return Err(Self::failure("watermark trailer missing"));
        }

        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(len_bytes);
        let marker_len = usize::try_from(u32::from_be_bytes(len_buf)).map_err(Self::failure)?;
        let payload_len = body
            .len()
            .checked_sub(marker_len)
            .ok_or_else(|| Self::failure("watermark length exceeds payload"))?;

        data.truncate(payload_len);
        Ok(data)
    }
}
