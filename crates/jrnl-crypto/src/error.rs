use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Tag mismatch, undecryptable ciphertext, or a malformed protected record.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// The record was written by a protocol version this client does not know.
    #[error("protocol version {version} is newer than the supported maximum {max}")]
    VersionTooNew { version: i64, max: u8 },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("asymmetric crypto error: {0}")]
    Asymmetric(String),

    #[error("key derivation failed: {0}")]
    Kdf(String),
}

impl CryptoError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, CryptoError::Integrity(_))
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(e: base64::DecodeError) -> Self {
        CryptoError::Encoding(format!("base64 decode: {e}"))
    }
}

impl From<rsa::Error> for CryptoError {
    fn from(e: rsa::Error) -> Self {
        CryptoError::Asymmetric(e.to_string())
    }
}
