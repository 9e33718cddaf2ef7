//! Journals: encrypted collection metadata protected by an integrity tag.

use jrnl_crypto::{sha256_hex, CryptoError, CryptoManager, CryptoResult, HMAC_SIZE};
use url::Url;
use uuid::Uuid;

use crate::client::{join_segment, ApiClient};
use crate::error::ApiError;
use crate::wire::JournalJson;

const JOURNALS_PATH: &str = "api/v1/journals/";

/// One journal. `tag == MAC(uid ‖ content)` holds for every journal built
/// through [`Journal::new`] or [`Journal::set_content`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journal {
    uid: String,
    owner: Option<String>,
    content: Vec<u8>,
    tag: [u8; HMAC_SIZE],
    version: i32,
    read_only: bool,
    key: Option<Vec<u8>>,
}

impl Journal {
    /// Encrypt `content` under `crypto` for a journal identified by `uid`.
    pub fn new(crypto: &CryptoManager, content: &[u8], uid: impl Into<String>) -> CryptoResult<Self> {
        let mut journal = Self {
            uid: uid.into(),
            owner: None,
            content: Vec::new(),
            tag: [0u8; HMAC_SIZE],
            version: i32::from(crypto.version().as_byte()),
            read_only: false,
            key: None,
        };
        journal.set_content(crypto, content)?;
        Ok(journal)
    }

    /// Fresh journal uid: hex SHA-256 of a random UUIDv4 string.
    pub fn gen_uid() -> String {
        sha256_hex(Uuid::new_v4().to_string().as_bytes())
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Journal key wrapped for this account (shared journals only).
    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn tag(&self) -> &[u8; HMAC_SIZE] {
        &self.tag
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.content
    }

    /// Decrypt the content. Does not check the tag; call [`Journal::verify`].
    pub fn content(&self, crypto: &CryptoManager) -> CryptoResult<Vec<u8>> {
        crypto.decrypt(&self.content)
    }

    /// Re-encrypt with a fresh IV and recompute the tag.
    pub fn set_content(&mut self, crypto: &CryptoManager, content: &[u8]) -> CryptoResult<()> {
        self.content = crypto.encrypt(content)?;
        self.tag = crypto.hmac(&self.tag_input());
        Ok(())
    }

    pub fn verify(&self, crypto: &CryptoManager) -> CryptoResult<()> {
        if crypto.verify_hmac(&self.tag_input(), &self.tag) {
            Ok(())
        } else {
            tracing::warn!(uid = %self.uid, "journal tag mismatch");
            Err(CryptoError::Integrity(format!(
                "journal {} failed its integrity check",
                self.uid
            )))
        }
    }

    fn tag_input(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.uid.len() + self.content.len());
        data.extend_from_slice(self.uid.as_bytes());
        data.extend_from_slice(&self.content);
        data
    }

    /// Wire record with `content = tag ‖ ciphertext`.
    pub fn to_wire(&self) -> JournalJson {
        let mut content = Vec::with_capacity(HMAC_SIZE + self.content.len());
        content.extend_from_slice(&self.tag);
        content.extend_from_slice(&self.content);
        JournalJson {
            uid: self.uid.clone(),
            owner: self.owner.clone(),
            version: self.version,
            content,
            read_only: self.read_only,
            key: self.key.clone(),
        }
    }

    /// Split the tag off a wire record's content.
    pub fn from_wire(json: JournalJson) -> CryptoResult<Self> {
        if json.content.len() < HMAC_SIZE {
            return Err(CryptoError::Integrity(format!(
                "journal {} content is {} bytes, shorter than its tag",
                json.uid,
                json.content.len()
            )));
        }
        let mut tag = [0u8; HMAC_SIZE];
        tag.copy_from_slice(&json.content[..HMAC_SIZE]);
        Ok(Self {
            uid: json.uid,
            owner: json.owner,
            content: json.content[HMAC_SIZE..].to_vec(),
            tag,
            version: json.version,
            read_only: json.read_only,
            key: json.key,
        })
    }
}

/// Journal CRUD against `api/v1/journals/`.
pub struct JournalManager<'a> {
    client: &'a ApiClient,
}

impl<'a> JournalManager<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    fn journals_url(&self) -> Result<Url, ApiError> {
        self.client.url(JOURNALS_PATH)
    }

    pub(crate) fn journal_url(&self, uid: &str) -> Result<Url, ApiError> {
        join_segment(&self.journals_url()?, uid)
    }

    /// All journals visible to this account. Tags are not verified here;
    /// each needs its own [`CryptoManager`].
    pub fn list(&self) -> Result<Vec<Journal>, ApiError> {
        let records: Vec<JournalJson> = self.client.get_json(self.journals_url()?)?;
        tracing::debug!(count = records.len(), "listed journals");
        records
            .into_iter()
            .map(|json| Journal::from_wire(json).map_err(ApiError::from))
            .collect()
    }

    pub fn create(&self, journal: &Journal) -> Result<(), ApiError> {
        self.client
            .post_json(self.journals_url()?, &journal.to_wire())?;
        tracing::info!(uid = %journal.uid(), "journal created");
        Ok(())
    }

    pub fn update(&self, journal: &Journal) -> Result<(), ApiError> {
        self.client
            .put_json(self.journal_url(journal.uid())?, &journal.to_wire())?;
        tracing::debug!(uid = %journal.uid(), "journal updated");
        Ok(())
    }

    pub fn delete(&self, journal: &Journal) -> Result<(), ApiError> {
        self.client.delete(self.journal_url(journal.uid())?)?;
        tracing::info!(uid = %journal.uid(), "journal deleted");
        Ok(())
    }
}
