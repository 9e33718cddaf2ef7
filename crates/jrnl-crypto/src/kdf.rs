//! Key derivation: scrypt(password, salt = username) → account root key

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scrypt::{scrypt, Params};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::ROOT_KEY_SIZE;

/// scrypt parameters for the root key
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// log2 of the CPU/memory cost N (default: 14, N = 16384)
    pub log_n: u8,
    /// Block size (default: 8)
    pub r: u32,
    /// Parallelism (default: 1)
    pub p: u32,
    /// Output length in bytes (default: 190)
    pub key_len: usize,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            log_n: 14,
            r: 8,
            p: 1,
            key_len: ROOT_KEY_SIZE,
        }
    }
}

/// Derive the account root key from the encryption password.
///
/// The salt is the account username. The result is base64 (standard
/// alphabet, padded) because that is how callers cache it and how
/// [`crate::CryptoManager::new`] accepts it. This is expensive on purpose:
/// compute it once per login, never per operation.
pub fn derive_key(salt: &str, password: &SecretString) -> CryptoResult<SecretString> {
    derive_key_with_params(salt, password, &KdfParams::default())
}

pub fn derive_key_with_params(
    salt: &str,
    password: &SecretString,
    params: &KdfParams,
) -> CryptoResult<SecretString> {
    // `len` on Params only matters for PHC strings; the output buffer sets the real length
    let scrypt_params = Params::new(params.log_n, params.r, params.p, Params::RECOMMENDED_LEN)
        .map_err(|e| CryptoError::Kdf(format!("invalid scrypt params: {e}")))?;

    let mut key = Zeroizing::new(vec![0u8; params.key_len]);
    scrypt(
        password.expose_secret().as_bytes(),
        salt.as_bytes(),
        &scrypt_params,
        &mut key,
    )
    .map_err(|e| CryptoError::Kdf(format!("scrypt failed: {e}")))?;

    tracing::debug!(key_len = params.key_len, "derived root key");
    Ok(SecretString::from(STANDARD.encode(&*key)))
}
