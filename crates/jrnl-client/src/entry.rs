//! Entries: the append-only, hash-chained log of a journal.
//!
//! Each entry uid is `hex(MAC(previous uid ‖ ciphertext))`, so a verified
//! chain proves order and completeness back to the anchor the caller
//! started from.

use jrnl_crypto::{CryptoError, CryptoManager, CryptoResult};
use url::Url;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::journal::JournalManager;
use crate::wire::EntryJson;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    uid: String,
    content: Vec<u8>,
}

impl Entry {
    /// Encrypt `content` as the successor of `previous` (`None` for the
    /// first entry of a journal).
    pub fn new(
        crypto: &CryptoManager,
        content: &[u8],
        previous: Option<&Entry>,
    ) -> CryptoResult<Self> {
        let mut entry = Self::with_uid("");
        entry.update(crypto, content, previous)?;
        Ok(entry)
    }

    /// Placeholder carrying only a uid, used as the `previous` anchor when
    /// the real predecessor is not at hand.
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            content: Vec::new(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.content
    }

    /// Replace the content and recompute the uid as the next chain link.
    pub fn update(
        &mut self,
        crypto: &CryptoManager,
        content: &[u8],
        previous: Option<&Entry>,
    ) -> CryptoResult<()> {
        self.content = crypto.encrypt(content)?;
        self.uid = hex::encode(crypto.hmac(&chain_input(&self.content, previous)));
        Ok(())
    }

    pub fn content(&self, crypto: &CryptoManager) -> CryptoResult<Vec<u8>> {
        crypto.decrypt(&self.content)
    }

    /// Check that this entry's uid links it to `previous`.
    pub fn verify(&self, crypto: &CryptoManager, previous: Option<&Entry>) -> CryptoResult<()> {
        let linked = hex::decode(&self.uid)
            .map(|tag| crypto.verify_hmac(&chain_input(&self.content, previous), &tag))
            .unwrap_or(false);
        if linked {
            Ok(())
        } else {
            Err(CryptoError::Integrity(format!(
                "entry {} does not follow {}",
                self.uid,
                previous.map_or("the start of the journal", |p| p.uid())
            )))
        }
    }

    pub fn to_wire(&self) -> EntryJson {
        EntryJson {
            uid: self.uid.clone(),
            content: self.content.clone(),
        }
    }

    pub fn from_wire(json: EntryJson) -> Self {
        Self {
            uid: json.uid,
            content: json.content,
        }
    }
}

fn chain_input(ciphertext: &[u8], previous: Option<&Entry>) -> Vec<u8> {
    let prev = previous.map_or(&[][..], |p| p.uid.as_bytes());
    let mut data = Vec::with_capacity(prev.len() + ciphertext.len());
    data.extend_from_slice(prev);
    data.extend_from_slice(ciphertext);
    data
}

/// Verify `entries` in order as the continuation of `last` (the uid the
/// caller already trusts, `None` for the start of the journal).
///
/// Stops at the first broken link.
pub fn verify_chain(
    crypto: &CryptoManager,
    last: Option<&str>,
    entries: &[Entry],
) -> CryptoResult<()> {
    let anchor = last.map(Entry::with_uid);
    let mut previous = anchor.as_ref();
    for (index, entry) in entries.iter().enumerate() {
        if let Err(e) = entry.verify(crypto, previous) {
            tracing::warn!(index, uid = %entry.uid(), "entry chain broken");
            return Err(e);
        }
        previous = Some(entry);
    }
    Ok(())
}

/// Entry log of one journal: `api/v1/journals/{uid}/entries/`.
pub struct EntryManager<'a> {
    client: &'a ApiClient,
    entries_url: Url,
}

impl<'a> EntryManager<'a> {
    pub fn new(client: &'a ApiClient, journal_uid: &str) -> Result<Self, ApiError> {
        let entries_url = JournalManager::new(client)
            .journal_url(journal_uid)?
            .join("entries/")?;
        Ok(Self {
            client,
            entries_url,
        })
    }

    /// Fetch entries after `last` (all when `None`), at most `limit`, and
    /// verify them as one chain. Any broken link fails the whole call.
    pub fn list(
        &self,
        crypto: &CryptoManager,
        last: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>, ApiError> {
        let mut url = self.entries_url.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(last) = last {
                query.append_pair("last", last);
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let records: Vec<EntryJson> = self.client.get_json(url)?;
        let entries: Vec<Entry> = records.into_iter().map(Entry::from_wire).collect();
        verify_chain(crypto, last, &entries)?;
        tracing::debug!(count = entries.len(), last = ?last, "fetched entries");
        Ok(entries)
    }

    /// Append `entries` after `last`, which must be the server's current
    /// head (`None` for an empty journal); otherwise the server answers
    /// with a conflict.
    pub fn create(&self, entries: &[Entry], last: Option<&str>) -> Result<(), ApiError> {
        let mut url = self.entries_url.clone();
        if let Some(last) = last {
            url.query_pairs_mut().append_pair("last", last);
        }
        let body: Vec<EntryJson> = entries.iter().map(Entry::to_wire).collect();
        self.client.post_json(url, &body)?;
        tracing::debug!(count = entries.len(), last = ?last, "appended entries");
        Ok(())
    }
}
