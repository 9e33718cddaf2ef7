//! Journal sharing: each member receives the journal's derived key wrapped
//! with their public key.

use jrnl_crypto::{CryptoManager, CryptoResult};
use url::Url;

use crate::client::{join_segment, ApiClient};
use crate::error::ApiError;
use crate::journal::JournalManager;
use crate::wire::MemberJson;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    user: String,
    key: Vec<u8>,
    read_only: bool,
}

impl Member {
    /// Wrap the journal key held by `crypto` for `user`'s public key.
    pub fn new(
        user: impl Into<String>,
        crypto: &CryptoManager,
        recipient_public_key: &[u8],
        read_only: bool,
    ) -> CryptoResult<Self> {
        Ok(Self {
            user: user.into(),
            key: crypto.wrap_key_for(recipient_public_key)?,
            read_only,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Wrapped journal key
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn to_wire(&self) -> MemberJson {
        MemberJson {
            user: self.user.clone(),
            key: self.key.clone(),
            read_only: self.read_only,
        }
    }

    pub fn from_wire(json: MemberJson) -> Self {
        Self {
            user: json.user,
            key: json.key,
            read_only: json.read_only,
        }
    }
}

/// Members of one journal: `api/v1/journals/{uid}/members/`.
pub struct MemberManager<'a> {
    client: &'a ApiClient,
    members_url: Url,
}

impl<'a> MemberManager<'a> {
    pub fn new(client: &'a ApiClient, journal_uid: &str) -> Result<Self, ApiError> {
        let members_url = JournalManager::new(client)
            .journal_url(journal_uid)?
            .join("members/")?;
        Ok(Self {
            client,
            members_url,
        })
    }

    pub fn list(&self) -> Result<Vec<Member>, ApiError> {
        let records: Vec<MemberJson> = self.client.get_json(self.members_url.clone())?;
        Ok(records.into_iter().map(Member::from_wire).collect())
    }

    pub fn create(&self, member: &Member) -> Result<(), ApiError> {
        self.client
            .post_json(self.members_url.clone(), &member.to_wire())?;
        tracing::info!(user = %member.user(), read_only = member.is_read_only(), "member added");
        Ok(())
    }

    pub fn delete(&self, member: &Member) -> Result<(), ApiError> {
        self.client
            .delete(join_segment(&self.members_url, member.user())?)?;
        tracing::info!(user = %member.user(), "member removed");
        Ok(())
    }
}
