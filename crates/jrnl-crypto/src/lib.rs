//! jrnl-crypto: client-side cryptography for the encrypted journal protocol
//!
//! Key hierarchy:
//! ```text
//! Root Key (190 bytes, scrypt(password, salt=username), cached base64 by the caller)
//!   └── Derived Key (per context: journal uid or "userInfo")
//!         v1: root key as-is (legacy)
//!         v2: HMAC-SHA256(key=context, data=root key)
//!         ├── Cipher Key = HMAC-SHA256(key="aes",  data=derived key)   AES-256-CBC/PKCS7
//!         └── HMAC Key   = HMAC-SHA256(key="hmac", data=derived key)   integrity tags
//! ```
//!
//! Shared journals carry their derived key wrapped with the member's RSA
//! public key (RSA-OAEP, SHA-256); see [`asymmetric`].

pub mod asymmetric;
pub mod cipher;
pub mod error;
pub mod fingerprint;
pub mod kdf;
pub mod keys;
pub mod manager;
pub mod version;

pub use asymmetric::{AsymmetricCryptoManager, AsymmetricKeyPair};
pub use error::{CryptoError, CryptoResult};
pub use fingerprint::{pretty_fingerprint, sha256, sha256_hex};
pub use kdf::{derive_key, KdfParams};
pub use manager::CryptoManager;
pub use version::{ProtocolVersion, CURRENT_VERSION};

/// Size of an HMAC-SHA256 tag / split key in bytes
pub const HMAC_SIZE: usize = 32;

/// Size of the AES-CBC initialization vector (one AES block)
pub const IV_SIZE: usize = 16;

/// Length of the scrypt-derived root key in bytes
pub const ROOT_KEY_SIZE: usize = 190;

/// Context salt used for the per-account UserInfo record
pub const USER_INFO_SALT: &str = "userInfo";
