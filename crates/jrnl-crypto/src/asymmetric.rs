//! RSA-OAEP key pairs used to share journal keys between accounts
//!
//! Only short secrets (journal derived keys) are ever wrapped here; bulk data
//! always goes through the symmetric path.

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};

/// Modulus size for newly generated account keys
pub const ACCOUNT_KEY_BITS: usize = 3072;

/// Smallest modulus accepted by [`AsymmetricKeyPair::generate_with_size`]
pub const MIN_KEY_BITS: usize = 2048;

/// An account key pair: PKCS#8 DER private key, SPKI DER public key.
///
/// The private key bytes are zeroized on drop.
#[derive(Clone)]
pub struct AsymmetricKeyPair {
    private_key: Vec<u8>,
    public_key: Vec<u8>,
}

impl AsymmetricKeyPair {
    /// Generate a fresh 3072-bit RSA key pair (e = 65537).
    pub fn generate() -> CryptoResult<Self> {
        Self::generate_with_size(ACCOUNT_KEY_BITS)
    }

    pub fn generate_with_size(bits: usize) -> CryptoResult<Self> {
        if bits < MIN_KEY_BITS {
            return Err(CryptoError::Asymmetric(format!(
                "RSA modulus of {bits} bits is too small (minimum {MIN_KEY_BITS})"
            )));
        }

        let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)?;
        let public = RsaPublicKey::from(&private);

        let private_der = private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Asymmetric(format!("encoding private key: {e}")))?;
        let public_der = public
            .to_public_key_der()
            .map_err(|e| CryptoError::Asymmetric(format!("encoding public key: {e}")))?;

        tracing::debug!(bits, "generated RSA key pair");
        Ok(Self {
            private_key: private_der.as_bytes().to_vec(),
            public_key: public_der.as_bytes().to_vec(),
        })
    }

    /// Rebuild a key pair from its encoded halves, checking that they match.
    pub fn from_parts(private_key: Vec<u8>, public_key: Vec<u8>) -> CryptoResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_der(&private_key)
            .map_err(|e| CryptoError::Asymmetric(format!("decoding private key: {e}")))?;
        let public = RsaPublicKey::from_public_key_der(&public_key)
            .map_err(|e| CryptoError::Asymmetric(format!("decoding public key: {e}")))?;

        if RsaPublicKey::from(&private) != public {
            return Err(CryptoError::Integrity(
                "public key does not belong to private key".into(),
            ));
        }

        Ok(Self {
            private_key,
            public_key,
        })
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

impl Drop for AsymmetricKeyPair {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl std::fmt::Debug for AsymmetricKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsymmetricKeyPair")
            .field("private_key", &"[REDACTED]")
            .field("public_key_len", &self.public_key.len())
            .finish()
    }
}

/// RSA-OAEP (SHA-256 digest and MGF1) wrap/unwrap bound to one key pair.
pub struct AsymmetricCryptoManager {
    private: RsaPrivateKey,
}

impl AsymmetricCryptoManager {
    pub fn new(key_pair: &AsymmetricKeyPair) -> CryptoResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_der(key_pair.private_key())
            .map_err(|e| CryptoError::Asymmetric(format!("decoding private key: {e}")))?;
        Ok(Self { private })
    }

    /// Wrap `data` for the holder of `public_key` (SPKI DER).
    pub fn encrypt(public_key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        let public = RsaPublicKey::from_public_key_der(public_key)
            .map_err(|e| CryptoError::Asymmetric(format!("decoding public key: {e}")))?;
        Ok(public.encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), data)?)
    }

    /// Unwrap data addressed to this key pair.
    ///
    /// A ciphertext that fails OAEP decoding was not produced for this key or
    /// was altered, so it is reported as an integrity failure.
    pub fn decrypt(&self, data: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
        self.private
            .decrypt(Oaep::new::<Sha256>(), data)
            .map(Zeroizing::new)
            .map_err(|e| CryptoError::Integrity(format!("RSA-OAEP unwrap failed: {e}")))
    }
}

impl std::fmt::Debug for AsymmetricCryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsymmetricCryptoManager")
            .field("private", &"[REDACTED]")
            .finish()
    }
}
