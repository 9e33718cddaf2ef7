use serde::{Deserialize, Serialize};

use crate::error::{JrnlError, JrnlResult};

/// Kind of collection a journal holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionType {
    AddressBook,
    Calendar,
    Tasks,
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddressBook => write!(f, "ADDRESS_BOOK"),
            Self::Calendar => write!(f, "CALENDAR"),
            Self::Tasks => write!(f, "TASKS"),
        }
    }
}

impl std::str::FromStr for CollectionType {
    type Err = JrnlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADDRESS_BOOK" | "ADDRESSBOOK" => Ok(Self::AddressBook),
            "CALENDAR" => Ok(Self::Calendar),
            "TASKS" => Ok(Self::Tasks),
            other => Err(JrnlError::Content(format!("unknown collection type: {other}"))),
        }
    }
}

/// Decrypted content of a journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ARGB color packed in an i32, as calendar clients store it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl CollectionInfo {
    pub fn new(collection_type: CollectionType, display_name: impl Into<String>) -> Self {
        Self {
            collection_type,
            display_name: display_name.into(),
            description: None,
            color: None,
            selected: None,
        }
    }

    pub fn to_json(&self) -> JrnlResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(data: &[u8]) -> JrnlResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// What an entry does to the collection item it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncAction {
    Add,
    Change,
    Delete,
}

/// Decrypted content of an entry: one change to one item (vCard/iCalendar text)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub action: SyncAction,
    pub content: String,
}

impl SyncEntry {
    pub fn new(action: SyncAction, content: impl Into<String>) -> Self {
        Self {
            action,
            content: content.into(),
        }
    }

    pub fn to_json(&self) -> JrnlResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(data: &[u8]) -> JrnlResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_info_wire_names() {
        let info = CollectionInfo::new(CollectionType::Calendar, "Work");
        let json = String::from_utf8(info.to_json().unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"CALENDAR","displayName":"Work"}"#);
    }

    #[test]
    fn test_collection_info_optional_fields() {
        let json = br#"{"type":"ADDRESS_BOOK","displayName":"Contacts","description":"people","color":-16776961,"selected":true}"#;
        let info = CollectionInfo::from_json(json).unwrap();
        assert_eq!(info.collection_type, CollectionType::AddressBook);
        assert_eq!(info.display_name, "Contacts");
        assert_eq!(info.description.as_deref(), Some("people"));
        assert_eq!(info.color, Some(-16776961));
        assert_eq!(info.selected, Some(true));
    }

    #[test]
    fn test_collection_info_rejects_unknown_type() {
        assert!(CollectionInfo::from_json(br#"{"type":"NOTES","displayName":"x"}"#).is_err());
    }

    #[test]
    fn test_collection_type_from_str() {
        assert_eq!("calendar".parse::<CollectionType>().unwrap(), CollectionType::Calendar);
        assert_eq!(
            "address_book".parse::<CollectionType>().unwrap(),
            CollectionType::AddressBook
        );
        assert!("journal".parse::<CollectionType>().is_err());
        assert_eq!(CollectionType::Tasks.to_string(), "TASKS");
    }

    #[test]
    fn test_sync_entry_json() {
        let entry = SyncEntry::new(SyncAction::Add, "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n");
        let json = entry.to_json().unwrap();
        let text = std::str::from_utf8(&json).unwrap();
        assert!(text.starts_with(r#"{"action":"ADD","content":"#));
        assert_eq!(SyncEntry::from_json(&json).unwrap(), entry);
    }

    #[test]
    fn test_sync_entry_bad_json() {
        assert!(matches!(
            SyncEntry::from_json(b"not json"),
            Err(JrnlError::Json(_))
        ));
    }
}
