use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DocumentUpload {
    pub filename: String,
    /// Base64-encoded file bytes.
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateExtensionRequest {
    pub extension_id: String,
    pub root_filename: String,
    pub files: Vec<DocumentUpload>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceDocumentsRequest {
    pub files: Vec<DocumentUpload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeSetParams {
    /// Start of the poll window, exclusive. Absent means a full snapshot.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}
