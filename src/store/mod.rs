mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Matched/modified counts reported by conditional bulk writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCounts {
    pub matched: usize,
    pub modified: usize,
}

/// Outcome of a bulk replace: counts plus the rows inserted as new versions.
#[derive(Debug)]
pub struct BulkReplaceResult {
    pub counts: WriteCounts,
    pub inserted: Vec<SchemaDocument>,
}

/// Store defines the document-store interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Document writes
    /// Inserts a batch of documents in one transaction: all rows or none.
    /// Ids are assigned here; the returned documents carry them.
    fn insert_documents(&self, docs: Vec<NewDocument>) -> Result<Vec<SchemaDocument>>;

    /// For each pair, marks the old row deleted (condition: still active) and
    /// inserts the new row. If any conditional update misses, the whole batch
    /// is rolled back; the returned counts still expose the shortfall so the
    /// caller can fail the operation.
    fn replace_documents(
        &self,
        pairs: Vec<(SchemaDocument, NewDocument)>,
    ) -> Result<BulkReplaceResult>;

    /// Marks every active document of the extension deleted.
    fn soft_delete_extension(
        &self,
        extension_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<WriteCounts>;

    // Lookups
    fn get_document(&self, id: &str) -> Result<Option<SchemaDocument>>;
    fn list_extension_documents(
        &self,
        extension_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<SchemaDocument>>;
    fn find_active_by_filenames(
        &self,
        extension_id: &str,
        filenames: &[String],
    ) -> Result<HashMap<String, SchemaDocument>>;
    fn extension_exists(&self, extension_id: &str) -> Result<bool>;
    fn list_extension_summaries(&self) -> Result<Vec<ExtensionSummary>>;

    // Change-feed queries; `since` is the exclusive start of the window
    fn list_active_items(&self) -> Result<Vec<ChangeItem>>;
    fn list_inserted_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeItem>>;
    fn list_modified_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeItem>>;
    fn list_deleted_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeItem>>;
}
