//! Protocol versions and the behavior that differs between them.
//!
//! Every version-dependent formula lives here so the derivation and MAC rules
//! cannot drift apart across call sites:
//!
//! | version | derived key                              | MAC input               |
//! |---------|------------------------------------------|-------------------------|
//! | 1       | root key                                 | `data`                  |
//! | 2       | HMAC-SHA256(key=context, data=root key)  | `data ‖ version byte`   |

use std::borrow::Cow;

use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::hmac_sha256;

/// Highest protocol version this client understands.
pub const CURRENT_VERSION: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolVersion {
    /// Legacy: no per-context key separation, MAC omits the version byte.
    V1,
    V2,
}

impl ProtocolVersion {
    pub const CURRENT: ProtocolVersion = ProtocolVersion::V2;

    /// Validate a version number as received from the server or a caller.
    ///
    /// Values outside the signed-byte range are an integrity failure (the
    /// record cannot have been produced by any client); values above
    /// [`CURRENT_VERSION`] mean this client is too old.
    pub fn from_raw(version: i64) -> CryptoResult<Self> {
        if version > i64::from(i8::MAX) {
            return Err(CryptoError::Integrity(format!(
                "version {version} is out of range"
            )));
        }
        if version > i64::from(CURRENT_VERSION) {
            return Err(CryptoError::VersionTooNew {
                version,
                max: CURRENT_VERSION,
            });
        }
        match version {
            1 => Ok(ProtocolVersion::V1),
            2 => Ok(ProtocolVersion::V2),
            _ => Err(CryptoError::Integrity(format!(
                "version {version} is out of range"
            ))),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            ProtocolVersion::V1 => 1,
            ProtocolVersion::V2 => 2,
        }
    }

    /// Derive the per-context key from the decoded root key.
    pub fn derive_key(self, root_key: &[u8], context_salt: &str) -> Zeroizing<Vec<u8>> {
        match self {
            ProtocolVersion::V1 => Zeroizing::new(root_key.to_vec()),
            ProtocolVersion::V2 => {
                Zeroizing::new(hmac_sha256(context_salt.as_bytes(), root_key).to_vec())
            }
        }
    }

    /// Bytes fed to HMAC for `data` under this version.
    ///
    /// V1 omits the version byte. A V1 tag is therefore not bound to its
    /// version; this is kept bit-exact for compatibility with existing
    /// journals until the protocol itself rejects V1.
    pub fn mac_input(self, data: &[u8]) -> Cow<'_, [u8]> {
        match self {
            ProtocolVersion::V1 => Cow::Borrowed(data),
            ProtocolVersion::V2 => {
                let mut input = Vec::with_capacity(data.len() + 1);
                input.extend_from_slice(data);
                input.push(self.as_byte());
                Cow::Owned(input)
            }
        }
    }
}

impl TryFrom<i64> for ProtocolVersion {
    type Error = CryptoError;

    fn try_from(version: i64) -> CryptoResult<Self> {
        Self::from_raw(version)
    }
}

impl TryFrom<i32> for ProtocolVersion {
    type Error = CryptoError;

    fn try_from(version: i32) -> CryptoResult<Self> {
        Self::from_raw(i64::from(version))
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> u8 {
        version.as_byte()
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_byte())
    }
}
