//! Per-account record holding the RSA public key in clear and the private
//! key encrypted under the account's "userInfo" keys.

use jrnl_crypto::{AsymmetricKeyPair, CryptoError, CryptoManager, CryptoResult, HMAC_SIZE};
use url::Url;
use zeroize::Zeroizing;

use crate::client::{join_segment, ApiClient};
use crate::error::ApiError;
use crate::wire::UserInfoJson;

const USER_PATH: &str = "api/v1/user/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    owner: String,
    version: u8,
    pubkey: Vec<u8>,
    /// `tag ‖ encrypted private key`, tag over `ciphertext ‖ pubkey`
    content: Option<Vec<u8>>,
}

impl UserInfo {
    /// Generate a fresh account key pair and seal it.
    pub fn generate(crypto: &CryptoManager, owner: impl Into<String>) -> CryptoResult<Self> {
        let key_pair = AsymmetricKeyPair::generate()?;
        Self::generate_with_key_pair(crypto, owner, &key_pair)
    }

    pub fn generate_with_key_pair(
        crypto: &CryptoManager,
        owner: impl Into<String>,
        key_pair: &AsymmetricKeyPair,
    ) -> CryptoResult<Self> {
        let ciphertext = crypto.encrypt(key_pair.private_key())?;
        let tag = crypto.hmac(&tag_input(&ciphertext, key_pair.public_key()));

        let mut content = Vec::with_capacity(HMAC_SIZE + ciphertext.len());
        content.extend_from_slice(&tag);
        content.extend_from_slice(&ciphertext);

        Ok(Self {
            owner: owner.into(),
            version: crypto.version().as_byte(),
            pubkey: key_pair.public_key().to_vec(),
            content: Some(content),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn public_key(&self) -> &[u8] {
        &self.pubkey
    }

    /// Decrypted private key (PKCS#8 DER), `None` when the record carries
    /// no private part. Does not check the tag; call [`UserInfo::verify`].
    pub fn content(&self, crypto: &CryptoManager) -> CryptoResult<Option<Zeroizing<Vec<u8>>>> {
        match &self.content {
            None => Ok(None),
            Some(content) => {
                let (_, ciphertext) = split_content(content)?;
                Ok(Some(Zeroizing::new(crypto.decrypt(ciphertext)?)))
            }
        }
    }

    /// Verify and decrypt the account key pair.
    pub fn key_pair(&self, crypto: &CryptoManager) -> CryptoResult<AsymmetricKeyPair> {
        self.verify(crypto)?;
        let private_key = self.content(crypto)?.ok_or_else(|| {
            CryptoError::Integrity(format!("user info of {} has no private key", self.owner))
        })?;
        AsymmetricKeyPair::from_parts(private_key.to_vec(), self.pubkey.clone())
    }

    /// Check the tag; a record without content has nothing to check.
    pub fn verify(&self, crypto: &CryptoManager) -> CryptoResult<()> {
        let Some(content) = &self.content else {
            return Ok(());
        };
        let (tag, ciphertext) = split_content(content)?;
        if crypto.verify_hmac(&tag_input(ciphertext, &self.pubkey), tag) {
            Ok(())
        } else {
            tracing::warn!(owner = %self.owner, "user info tag mismatch");
            Err(CryptoError::Integrity(format!(
                "user info of {} failed its integrity check",
                self.owner
            )))
        }
    }

    pub fn to_wire(&self) -> UserInfoJson {
        UserInfoJson {
            owner: self.owner.clone(),
            version: self.version,
            pubkey: self.pubkey.clone(),
            content: self.content.clone(),
        }
    }

    pub fn from_wire(json: UserInfoJson) -> Self {
        Self {
            owner: json.owner,
            version: json.version,
            pubkey: json.pubkey,
            content: json.content,
        }
    }
}

fn split_content(content: &[u8]) -> CryptoResult<(&[u8], &[u8])> {
    if content.len() < HMAC_SIZE {
        return Err(CryptoError::Integrity(format!(
            "user info content is {} bytes, shorter than its tag",
            content.len()
        )));
    }
    Ok(content.split_at(HMAC_SIZE))
}

fn tag_input(ciphertext: &[u8], pubkey: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(ciphertext.len() + pubkey.len());
    data.extend_from_slice(ciphertext);
    data.extend_from_slice(pubkey);
    data
}

/// `api/v1/user/` records, addressed by owner.
pub struct UserInfoManager<'a> {
    client: &'a ApiClient,
}

impl<'a> UserInfoManager<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    fn user_url(&self, owner: &str) -> Result<Url, ApiError> {
        join_segment(&self.client.url(USER_PATH)?, owner)
    }

    /// Fetch `owner`'s record; `None` when the account has none yet.
    pub fn get(&self, owner: &str) -> Result<Option<UserInfo>, ApiError> {
        match self.client.get_json::<UserInfoJson>(self.user_url(owner)?) {
            Ok(json) => Ok(Some(UserInfo::from_wire(json))),
            Err(e) if e.is_not_found() => {
                tracing::debug!(owner, "no user info");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn create(&self, user_info: &UserInfo) -> Result<(), ApiError> {
        self.client
            .post_json(self.client.url(USER_PATH)?, &user_info.to_wire())?;
        tracing::info!(owner = %user_info.owner(), "user info created");
        Ok(())
    }

    pub fn update(&self, user_info: &UserInfo) -> Result<(), ApiError> {
        self.client
            .put_json(self.user_url(user_info.owner())?, &user_info.to_wire())?;
        Ok(())
    }

    pub fn delete(&self, user_info: &UserInfo) -> Result<(), ApiError> {
        self.client.delete(self.user_url(user_info.owner())?)?;
        tracing::info!(owner = %user_info.owner(), "user info deleted");
        Ok(())
    }
}
