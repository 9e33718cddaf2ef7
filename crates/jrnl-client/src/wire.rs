//! JSON records exchanged with the server. Byte fields travel as standard
//! base64.

use serde::{Deserialize, Serialize};

pub(crate) mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(b) => s.serialize_some(&STANDARD.encode(b)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// Journal as stored by the server; `content` is `tag ‖ ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalJson {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub version: i32,
    #[serde(with = "b64")]
    pub content: Vec<u8>,
    #[serde(default)]
    pub read_only: bool,
    /// Journal key wrapped for this account, present on shared journals
    #[serde(default, with = "b64::option", skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryJson {
    pub uid: String,
    #[serde(with = "b64")]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberJson {
    pub user: String,
    #[serde(with = "b64")]
    pub key: Vec<u8>,
    #[serde(default)]
    pub read_only: bool,
}

/// UserInfo record; `content` is `tag ‖ encrypted private key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoJson {
    pub owner: String,
    pub version: u8,
    #[serde(with = "b64")]
    pub pubkey: Vec<u8>,
    #[serde(default, with = "b64::option")]
    pub content: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenJson {
    pub token: String,
}
