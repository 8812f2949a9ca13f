use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One physical schema file within an extension.
///
/// Rows are append-mostly: replacing a document inserts a new row and
/// soft-deletes the old one; deleting an extension only flips `deleted` and
/// touches `last_update_time`. The change feed reconstructs history from the
/// two timestamps alone, so a deleted row never changes again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub id: String,
    pub extension_id: String,
    pub filename: String,
    #[serde(with = "base64_blob")]
    pub content: Vec<u8>,
    pub is_root: bool,
    pub insertion_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    pub deleted: bool,
}

/// Insert payload for a document that has no store-assigned id yet.
///
/// Ids exist only on [`SchemaDocument`], so a row cannot be inserted with a
/// caller-chosen id and an inserted row cannot lose its id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub extension_id: String,
    pub filename: String,
    pub content: Vec<u8>,
    pub is_root: bool,
    pub insertion_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

/// Derived view of an extension: the active documents sharing an extension id.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionSummary {
    pub extension_id: String,
    pub root_filename: String,
    pub document_count: i64,
    /// Earliest member insertion time.
    pub insertion_time: DateTime<Utc>,
    /// Latest member update time.
    pub last_update_time: DateTime<Utc>,
}

/// One entry of a change set; identifies a document without carrying content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeItem {
    pub document_id: String,
    pub extension_id: String,
    pub filename: String,
}

/// What changed in the half-open window `(last_update, timestamp]`.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    /// "Now" for this computation; callers pass it back as the next `last_update`.
    pub timestamp: DateTime<Utc>,
    pub total_count: usize,
    pub insertions: Vec<ChangeItem>,
    pub modifications: Vec<ChangeItem>,
    pub deletions: Vec<ChangeItem>,
}

mod base64_blob {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
