//! Encrypt-then-MAC for the unauthenticated cipher modes.

use crate::error::{CryptoError, CryptoResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of an envelope MAC and of the key it is computed with.
pub const MAC_LEN: usize = 32;

/// HMAC-SHA256 over the envelope header and ciphertext.
pub fn compute(key: &[u8], header: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut mac = keyed(key)?;
    feed(&mut mac, header, ciphertext);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Check a stored MAC in constant time. A missing MAC fails like a wrong one.
pub fn verify(key: &[u8], header: &[u8], ciphertext: &[u8], expected: Option<&[u8]>) -> CryptoResult<()> {
    let expected = expected.ok_or(CryptoError::AuthenticationFailed)?;
    let mut mac = keyed(key)?;
    feed(&mut mac, header, ciphertext);
    mac.verify_slice(expected)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

fn keyed(key: &[u8]) -> CryptoResult<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: MAC_LEN,
        got: key.len(),
    })
}

// Length-prefix the header so header and ciphertext bytes cannot be shifted across the boundary.
fn feed(mac: &mut HmacSha256, header: &[u8], ciphertext: &[u8]) {
    mac.update(&(header.len() as u64).to_be_bytes());
    mac.update(header);
    mac.update(ciphertext);
}
