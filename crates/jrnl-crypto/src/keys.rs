//! HMAC-SHA256 key separation: derived key → cipher key + HMAC key

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::HMAC_SIZE;

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

/// HMAC-SHA256 of `data` keyed with `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; HMAC_SIZE] {
    let mut mac = keyed(key);
    mac.update(data);
    let mut out = [0u8; HMAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Check `tag` against HMAC-SHA256 of `data` in constant time.
///
/// A tag of the wrong length never verifies.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let mut mac = keyed(key);
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

/// The two working keys split from a derived key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SplitKeys {
    cipher_key: [u8; HMAC_SIZE],
    hmac_key: [u8; HMAC_SIZE],
}

impl SplitKeys {
    /// Split a derived key so the encryption key is never usable as the
    /// authentication key and vice versa.
    pub fn from_derived(derived_key: &[u8]) -> Self {
        Self {
            cipher_key: hmac_sha256(b"aes", derived_key),
            hmac_key: hmac_sha256(b"hmac", derived_key),
        }
    }

    pub fn cipher_key(&self) -> &[u8; HMAC_SIZE] {
        &self.cipher_key
    }

    pub fn hmac_key(&self) -> &[u8; HMAC_SIZE] {
        &self.hmac_key
    }
}

impl std::fmt::Debug for SplitKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitKeys")
            .field("cipher_key", &"[REDACTED]")
            .field("hmac_key", &"[REDACTED]")
            .finish()
    }
}
