//! CryptoManager: per-context key derivation, encryption and integrity tags

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::asymmetric::{AsymmetricCryptoManager, AsymmetricKeyPair};
use crate::cipher;
use crate::error::CryptoResult;
use crate::keys::{hmac_sha256, verify_hmac_sha256, SplitKeys};
use crate::version::ProtocolVersion;
use crate::HMAC_SIZE;

/// Keys for one journal (or the user-info record) under one protocol version.
///
/// Built either from the account root key plus a context salt, or by
/// unwrapping a derived key that another member shared with this account.
/// Holds raw key material; reconstruct it per session instead of persisting it.
#[derive(Clone)]
pub struct CryptoManager {
    version: ProtocolVersion,
    derived_key: Zeroizing<Vec<u8>>,
    keys: SplitKeys,
}

impl CryptoManager {
    /// Derive keys from the base64 root key (see [`crate::derive_key`]).
    ///
    /// `version` is validated first: above 127 is an integrity error, above
    /// [`crate::CURRENT_VERSION`] is `VersionTooNew`.
    pub fn new(version: i64, root_key: &SecretString, context_salt: &str) -> CryptoResult<Self> {
        let version = ProtocolVersion::from_raw(version)?;
        let root = Zeroizing::new(STANDARD.decode(root_key.expose_secret())?);
        let derived_key = version.derive_key(&root, context_salt);
        Ok(Self::from_derived_key(version, derived_key))
    }

    /// Rebuild the manager of a journal shared with this account.
    pub fn from_wrapped_key(
        version: i64,
        key_pair: &AsymmetricKeyPair,
        wrapped_key: &[u8],
    ) -> CryptoResult<Self> {
        let version = ProtocolVersion::from_raw(version)?;
        let derived_key = AsymmetricCryptoManager::new(key_pair)?.decrypt(wrapped_key)?;
        Ok(Self::from_derived_key(version, derived_key))
    }

    fn from_derived_key(version: ProtocolVersion, derived_key: Zeroizing<Vec<u8>>) -> Self {
        let keys = SplitKeys::from_derived(&derived_key);
        Self {
            version,
            derived_key,
            keys,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn cipher_key(&self) -> &[u8; HMAC_SIZE] {
        self.keys.cipher_key()
    }

    pub fn hmac_key(&self) -> &[u8; HMAC_SIZE] {
        self.keys.hmac_key()
    }

    /// AES-256-CBC encrypt with a fresh IV: `[IV][ciphertext]`.
    pub fn encrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        cipher::encrypt(self.cipher_key(), data)
    }

    /// Decrypt `[IV][ciphertext]`; bad padding is an integrity error.
    pub fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        cipher::decrypt(self.cipher_key(), data)
    }

    /// Integrity tag over `data`, using this version's MAC rule.
    pub fn hmac(&self, data: &[u8]) -> [u8; HMAC_SIZE] {
        hmac_sha256(self.hmac_key(), &self.version.mac_input(data))
    }

    /// Constant-time comparison of `tag` against the tag of `data`.
    pub fn verify_hmac(&self, data: &[u8], tag: &[u8]) -> bool {
        verify_hmac_sha256(self.hmac_key(), &self.version.mac_input(data), tag)
    }

    /// Wrap this manager's derived key for another account's public key, as
    /// stored in that account's membership record.
    pub fn wrap_key_for(&self, public_key: &[u8]) -> CryptoResult<Vec<u8>> {
        AsymmetricCryptoManager::encrypt(public_key, &self.derived_key)
    }
}

impl std::fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoManager")
            .field("version", &self.version)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}
