//! AES-256-CBC with PKCS#7 padding
//!
//! Ciphertext format (binary):
//! ```text
//! [16 bytes: random IV][N * 16 bytes: CBC ciphertext]
//! ```
//!
//! CBC provides no authentication by itself: every protocol record carries a
//! separate HMAC-SHA256 tag (see [`crate::CryptoManager::hmac`]) which callers
//! must verify before trusting decrypted content.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::IV_SIZE;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    encrypt_with_iv(key, &iv, plaintext)
}

pub(crate) fn encrypt_with_iv(
    key: &[u8],
    iv: &[u8; IV_SIZE],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Encoding(format!("invalid AES key: {e}")))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut result = Vec::with_capacity(IV_SIZE + ciphertext.len());
    result.extend_from_slice(iv);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt `[IV][ciphertext]` produced by [`encrypt`].
///
/// Short input, a partial block, or bad padding are all reported as
/// integrity failures: the record was altered or encrypted under another key.
pub fn decrypt(key: &[u8], encrypted: &[u8]) -> CryptoResult<Vec<u8>> {
    if encrypted.len() < 2 * IV_SIZE || encrypted.len() % IV_SIZE != 0 {
        return Err(CryptoError::Integrity(format!(
            "ciphertext has invalid length: {} bytes",
            encrypted.len()
        )));
    }

    let (iv, ciphertext) = encrypted.split_at(IV_SIZE);
    let cipher = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Encoding(format!("invalid AES key: {e}")))?;

    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Integrity("decryption failed: bad padding".into()))
}
