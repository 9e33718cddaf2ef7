//! Key material of one logged-in account.

use std::collections::hash_map::{Entry, HashMap};

use jrnl_crypto::{
    derive_key, AsymmetricKeyPair, CryptoError, CryptoManager, CryptoResult, ProtocolVersion,
    USER_INFO_SALT,
};
use secrecy::SecretString;

use crate::journal::Journal;
use crate::user_info::UserInfo;

/// Root key, optional account key pair, and the per-context
/// [`CryptoManager`]s built from them.
///
/// Owned by the session; dropping it drops every cached key.
pub struct KeyRing {
    root_key: SecretString,
    key_pair: Option<AsymmetricKeyPair>,
    managers: HashMap<String, CryptoManager>,
}

impl KeyRing {
    /// `root_key` is the base64 output of [`jrnl_crypto::derive_key`].
    pub fn new(root_key: SecretString) -> Self {
        Self {
            root_key,
            key_pair: None,
            managers: HashMap::new(),
        }
    }

    /// Run the password KDF (salted with the username) and wrap the result.
    pub fn from_password(username: &str, password: &SecretString) -> CryptoResult<Self> {
        Ok(Self::new(derive_key(username, password)?))
    }

    pub fn root_key(&self) -> &SecretString {
        &self.root_key
    }

    pub fn key_pair(&self) -> Option<&AsymmetricKeyPair> {
        self.key_pair.as_ref()
    }

    pub fn set_key_pair(&mut self, key_pair: AsymmetricKeyPair) {
        // shared journal keys were unwrapped with the old pair
        self.managers.retain(|uid, _| uid == USER_INFO_SALT);
        self.key_pair = Some(key_pair);
    }

    /// Verify `user_info` and adopt its key pair.
    pub fn unlock(&mut self, user_info: &UserInfo) -> CryptoResult<()> {
        let key_pair = {
            let crypto = self.user_info_crypto(i64::from(user_info.version()))?;
            user_info.key_pair(crypto)?
        };
        self.set_key_pair(key_pair);
        Ok(())
    }

    /// Keys for the account's UserInfo record.
    pub fn user_info_crypto(&mut self, version: i64) -> CryptoResult<&CryptoManager> {
        let root_key = &self.root_key;
        cached(&mut self.managers, USER_INFO_SALT, version, || {
            CryptoManager::new(version, root_key, USER_INFO_SALT)
        })
    }

    /// Keys for a journal this account owns, by uid (e.g. before creating it).
    pub fn owned_journal_crypto(&mut self, uid: &str, version: i64) -> CryptoResult<&CryptoManager> {
        let root_key = &self.root_key;
        cached(&mut self.managers, uid, version, || {
            CryptoManager::new(version, root_key, uid)
        })
    }

    /// Keys for `journal`: unwrapped from its member key when the journal was
    /// shared with this account, otherwise derived from the root key.
    pub fn journal_crypto(&mut self, journal: &Journal) -> CryptoResult<&CryptoManager> {
        let version = i64::from(journal.version());
        let root_key = &self.root_key;
        let key_pair = self.key_pair.as_ref();
        cached(&mut self.managers, journal.uid(), version, || match journal.key() {
            Some(wrapped) => {
                let key_pair = key_pair.ok_or_else(|| {
                    CryptoError::Asymmetric(format!(
                        "journal {} is shared with this account but no key pair is loaded",
                        journal.uid()
                    ))
                })?;
                CryptoManager::from_wrapped_key(version, key_pair, wrapped)
            }
            None => CryptoManager::new(version, root_key, journal.uid()),
        })
    }

    /// Drop the cached keys of one journal (e.g. after it was deleted).
    pub fn forget(&mut self, uid: &str) {
        self.managers.remove(uid);
    }

    pub fn cached_count(&self) -> usize {
        self.managers.len()
    }
}

/// Cache lookup keyed by context; a cached manager built for another
/// protocol version is replaced.
fn cached<'m>(
    managers: &'m mut HashMap<String, CryptoManager>,
    context: &str,
    version: i64,
    build: impl FnOnce() -> CryptoResult<CryptoManager>,
) -> CryptoResult<&'m CryptoManager> {
    let wanted = ProtocolVersion::from_raw(version)?;
    match managers.entry(context.to_string()) {
        Entry::Occupied(mut slot) => {
            if slot.get().version() != wanted {
                slot.insert(build()?);
            }
            Ok(slot.into_mut())
        }
        Entry::Vacant(slot) => Ok(slot.insert(build()?)),
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("root_key", &"[REDACTED]")
            .field("has_key_pair", &self.key_pair.is_some())
            .field("cached", &self.managers.len())
            .finish()
    }
}
