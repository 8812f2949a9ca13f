use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::service::verify_applied;
use crate::store::Store;
use crate::types::{ExtensionSummary, NewDocument, SchemaDocument};

/// An uploaded file: filename plus raw content bytes.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Owns the lifecycle of an extension: a named group of schema documents with
/// exactly one root. Every mutation goes through the store as a verified batch
/// write; an extension is never left half-created or half-replaced.
pub struct ExtensionService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ExtensionService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates an extension from a set of files, one of which must be the
    /// designated root. A previously deleted extension id may be reused; only
    /// an *active* extension with the same id is a conflict.
    pub fn create_extension(
        &self,
        extension_id: &str,
        root_filename: &str,
        files: Vec<FileUpload>,
    ) -> Result<Vec<SchemaDocument>> {
        validate_upload_set(&files)?;

        if !files.iter().any(|f| f.filename == root_filename) {
            return Err(Error::RootNotValid(root_filename.to_string()));
        }

        // Fast pre-check for a friendly error; the store's unique index on
        // active (extension_id, filename) is the source of truth under races.
        if self.store.extension_exists(extension_id)? {
            return Err(Error::ExtensionAlreadyExists(extension_id.to_string()));
        }

        let now = self.clock.now();
        let expected = files.len();
        let docs = files
            .into_iter()
            .map(|file| NewDocument {
                extension_id: extension_id.to_string(),
                is_root: file.filename == root_filename,
                filename: file.filename,
                content: file.content,
                insertion_time: now,
                last_update_time: now,
            })
            .collect();

        let inserted = self.store.insert_documents(docs)?;
        verify_applied("insert", expected, inserted.len(), inserted.len())?;

        info!("Created extension {extension_id} with {expected} documents");
        Ok(inserted)
    }

    /// Replaces the named members of an active extension with new content.
    /// Filenames are the binding key: each named file must currently be an
    /// active member, and the new version inherits the old one's root flag and
    /// insertion time, so the change feed reports the swap as a modification
    /// of the same logical document.
    pub fn replace_documents(
        &self,
        extension_id: &str,
        files: Vec<FileUpload>,
    ) -> Result<Vec<SchemaDocument>> {
        validate_upload_set(&files)?;

        let filenames: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
        let current = self
            .store
            .find_active_by_filenames(extension_id, &filenames)?;

        let missing: Vec<&str> = filenames
            .iter()
            .filter(|name| !current.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(Error::DocumentNotFound(format!(
                "extension {extension_id} has no active documents named {}",
                missing.join(", ")
            )));
        }

        let now = self.clock.now();
        let mut pairs = Vec::with_capacity(files.len());
        for file in files {
            let old = current[&file.filename].clone();
            let new = NewDocument {
                extension_id: extension_id.to_string(),
                filename: file.filename,
                content: file.content,
                is_root: old.is_root,
                insertion_time: old.insertion_time,
                last_update_time: now,
            };
            pairs.push((old, new));
        }

        let expected = pairs.len();
        let result = self.store.replace_documents(pairs)?;
        verify_applied(
            "replace",
            expected,
            result.counts.matched,
            result.counts.modified,
        )?;

        info!("Replaced {expected} documents in extension {extension_id}");
        Ok(result.inserted)
    }

    /// Soft-deletes every active member of the extension. Deleting an already
    /// deleted (or unknown) extension is an error, not a silent no-op.
    pub fn delete_extension(&self, extension_id: &str) -> Result<usize> {
        let active = self.store.list_extension_documents(extension_id, false)?;
        if active.is_empty() {
            return Err(Error::ExtensionNotFound(extension_id.to_string()));
        }

        let counts = self
            .store
            .soft_delete_extension(extension_id, self.clock.now())?;
        verify_applied("delete", active.len(), counts.matched, counts.modified)?;

        info!(
            "Deleted extension {extension_id} ({} documents)",
            active.len()
        );
        Ok(active.len())
    }

    /// Looks up a document by id, deleted or not; callers needing only active
    /// documents must check the `deleted` flag themselves.
    pub fn get_document(&self, id: &str) -> Result<SchemaDocument> {
        self.store
            .get_document(id)?
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    /// Returns the active members of an extension.
    pub fn get_extension_documents(&self, extension_id: &str) -> Result<Vec<SchemaDocument>> {
        let docs = self.store.list_extension_documents(extension_id, false)?;
        if docs.is_empty() {
            return Err(Error::ExtensionNotFound(extension_id.to_string()));
        }
        Ok(docs)
    }

    pub fn list_extensions(&self) -> Result<Vec<ExtensionSummary>> {
        self.store.list_extension_summaries()
    }
}

fn validate_upload_set(files: &[FileUpload]) -> Result<()> {
    if files.is_empty() {
        return Err(Error::BadRequest(
            "upload must contain at least one file".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for file in files {
        if !seen.insert(file.filename.as_str()) {
            return Err(Error::BadRequest(format!(
                "duplicate filename in upload: {}",
                file.filename
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    use crate::service::testing::ManualClock;
    use crate::store::SqliteStore;

    fn start() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    fn setup() -> (TempDir, Arc<ManualClock>, ExtensionService) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let clock = Arc::new(ManualClock::new(start()));
        let service = ExtensionService::new(Arc::new(store), clock.clone());
        (temp, clock, service)
    }

    fn upload(filename: &str) -> FileUpload {
        FileUpload {
            filename: filename.to_string(),
            content: format!("<xs:schema id=\"{filename}\"/>").into_bytes(),
        }
    }

    fn upload_with(filename: &str, content: &str) -> FileUpload {
        FileUpload {
            filename: filename.to_string(),
            content: content.as_bytes().to_vec(),
        }
    }

    #[test]
    fn create_returns_active_documents_with_single_root() {
        let (_temp, _clock, service) = setup();

        service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd"), upload("a.xsd")])
            .unwrap();

        let docs = service.get_extension_documents("ext-1").unwrap();
        assert_eq!(docs.len(), 2);

        let roots: Vec<_> = docs.iter().filter(|d| d.is_root).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].filename, "root.xsd");
        assert!(docs.iter().all(|d| !d.deleted));
        assert!(docs.iter().all(|d| d.insertion_time == start()));
    }

    #[test]
    fn create_rejects_missing_root() {
        let (_temp, _clock, service) = setup();

        let result = service.create_extension("ext-1", "missing.xsd", vec![upload("a.xsd")]);
        assert!(matches!(result, Err(Error::RootNotValid(_))));
    }

    #[test]
    fn create_rejects_duplicate_filenames() {
        let (_temp, _clock, service) = setup();

        let result = service.create_extension(
            "ext-1",
            "root.xsd",
            vec![upload("root.xsd"), upload("root.xsd")],
        );
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn create_rejects_empty_upload() {
        let (_temp, _clock, service) = setup();

        let result = service.create_extension("ext-1", "root.xsd", Vec::new());
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn create_conflicts_with_active_extension() {
        let (_temp, _clock, service) = setup();

        service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd")])
            .unwrap();

        let result = service.create_extension("ext-1", "other.xsd", vec![upload("other.xsd")]);
        assert!(matches!(result, Err(Error::ExtensionAlreadyExists(_))));
    }

    #[test]
    fn create_allows_reusing_deleted_extension_id() {
        let (_temp, clock, service) = setup();

        service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd")])
            .unwrap();
        clock.advance_secs(10);
        service.delete_extension("ext-1").unwrap();

        clock.advance_secs(10);
        service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd")])
            .unwrap();

        let docs = service.get_extension_documents("ext-1").unwrap();
        assert_eq!(docs.len(), 1);
        assert!(!docs[0].deleted);
    }

    #[test]
    fn replace_versions_documents_in_place() {
        let (_temp, clock, service) = setup();

        let created = service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd"), upload("a.xsd")])
            .unwrap();
        let old = created.iter().find(|d| d.filename == "a.xsd").unwrap();

        clock.advance_secs(60);
        let replaced = service
            .replace_documents("ext-1", vec![upload_with("a.xsd", "<xs:schema id=\"v2\"/>")])
            .unwrap();
        assert_eq!(replaced.len(), 1);

        // The old row is now a soft-deleted version.
        let old_row = service.get_document(&old.id).unwrap();
        assert!(old_row.deleted);
        assert_eq!(old_row.last_update_time, clock.now());

        // The new row keeps the filename and the logical insertion time.
        let new_row = &replaced[0];
        assert_ne!(new_row.id, old.id);
        assert_eq!(new_row.filename, "a.xsd");
        assert_eq!(new_row.content, b"<xs:schema id=\"v2\"/>");
        assert_eq!(new_row.insertion_time, old.insertion_time);
        assert_eq!(new_row.last_update_time, clock.now());

        let docs = service.get_extension_documents("ext-1").unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn replace_preserves_root_flag() {
        let (_temp, clock, service) = setup();

        service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd"), upload("a.xsd")])
            .unwrap();

        clock.advance_secs(1);
        let replaced = service
            .replace_documents("ext-1", vec![upload("root.xsd")])
            .unwrap();
        assert!(replaced[0].is_root);

        let docs = service.get_extension_documents("ext-1").unwrap();
        assert_eq!(docs.iter().filter(|d| d.is_root).count(), 1);
    }

    #[test]
    fn replace_reports_all_missing_filenames() {
        let (_temp, _clock, service) = setup();

        service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd"), upload("a.xsd")])
            .unwrap();

        let result = service.replace_documents(
            "ext-1",
            vec![upload("a.xsd"), upload("b.xsd"), upload("c.xsd")],
        );
        match result {
            Err(Error::DocumentNotFound(message)) => {
                assert!(message.contains("b.xsd"));
                assert!(message.contains("c.xsd"));
                assert!(!message.contains("a.xsd"));
            }
            other => panic!("expected DocumentNotFound, got {other:?}"),
        }
    }

    #[test]
    fn delete_soft_deletes_every_member() {
        let (_temp, clock, service) = setup();

        let created = service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd"), upload("a.xsd")])
            .unwrap();

        clock.advance_secs(5);
        let deleted = service.delete_extension("ext-1").unwrap();
        assert_eq!(deleted, 2);

        let result = service.get_extension_documents("ext-1");
        assert!(matches!(result, Err(Error::ExtensionNotFound(_))));

        // Rows survive as history, marked deleted and touched at delete time.
        for doc in &created {
            let row = service.get_document(&doc.id).unwrap();
            assert!(row.deleted);
            assert_eq!(row.last_update_time, clock.now());
            assert_eq!(row.insertion_time, start());
        }
    }

    #[test]
    fn delete_of_deleted_extension_reports_not_found() {
        let (_temp, _clock, service) = setup();

        service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd")])
            .unwrap();
        service.delete_extension("ext-1").unwrap();

        let result = service.delete_extension("ext-1");
        assert!(matches!(result, Err(Error::ExtensionNotFound(_))));
    }

    #[test]
    fn delete_of_unknown_extension_reports_not_found() {
        let (_temp, _clock, service) = setup();

        let result = service.delete_extension("nope");
        assert!(matches!(result, Err(Error::ExtensionNotFound(_))));
    }

    #[test]
    fn get_document_returns_deleted_rows() {
        let (_temp, _clock, service) = setup();

        let created = service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd")])
            .unwrap();
        service.delete_extension("ext-1").unwrap();

        let row = service.get_document(&created[0].id).unwrap();
        assert!(row.deleted);

        let result = service.get_document("missing-id");
        assert!(matches!(result, Err(Error::DocumentNotFound(_))));
    }

    #[test]
    fn root_invariant_holds_across_lifecycle() {
        let (_temp, clock, service) = setup();

        service
            .create_extension(
                "ext-1",
                "root.xsd",
                vec![upload("root.xsd"), upload("a.xsd"), upload("b.xsd")],
            )
            .unwrap();

        clock.advance_secs(1);
        service
            .replace_documents("ext-1", vec![upload("root.xsd"), upload("b.xsd")])
            .unwrap();

        let docs = service.get_extension_documents("ext-1").unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs.iter().filter(|d| d.is_root).count(), 1);

        // Filenames stay unique among active members.
        let mut names: Vec<_> = docs.iter().map(|d| d.filename.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 3);

        clock.advance_secs(1);
        service.delete_extension("ext-1").unwrap();
        clock.advance_secs(1);
        service
            .create_extension("ext-1", "a.xsd", vec![upload("a.xsd")])
            .unwrap();

        let docs = service.get_extension_documents("ext-1").unwrap();
        assert_eq!(docs.iter().filter(|d| d.is_root).count(), 1);
        assert_eq!(docs[0].filename, "a.xsd");
    }

    #[test]
    fn list_extensions_summarizes_active_members() {
        let (_temp, clock, service) = setup();

        service
            .create_extension("ext-1", "root.xsd", vec![upload("root.xsd"), upload("a.xsd")])
            .unwrap();
        clock.advance_secs(30);
        service
            .create_extension("ext-2", "main.xsd", vec![upload("main.xsd")])
            .unwrap();
        clock.advance_secs(30);
        service
            .replace_documents("ext-1", vec![upload("a.xsd")])
            .unwrap();

        let summaries = service.list_extensions().unwrap();
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].extension_id, "ext-1");
        assert_eq!(summaries[0].root_filename, "root.xsd");
        assert_eq!(summaries[0].document_count, 2);
        assert_eq!(summaries[0].insertion_time, start());
        assert_eq!(summaries[0].last_update_time, clock.now());

        assert_eq!(summaries[1].extension_id, "ext-2");
        assert_eq!(summaries[1].document_count, 1);
    }
}
