use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::schema::SCHEMA;
use super::{BulkReplaceResult, Store, WriteCounts};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn to_micros(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_micros()
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_else(|| {
        tracing::error!("Invalid timestamp in database: {micros}");
        Utc::now()
    })
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<SchemaDocument> {
    Ok(SchemaDocument {
        id: row.get(0)?,
        extension_id: row.get(1)?,
        filename: row.get(2)?,
        content: row.get(3)?,
        is_root: row.get(4)?,
        insertion_time: from_micros(row.get(5)?),
        last_update_time: from_micros(row.get(6)?),
        deleted: row.get(7)?,
    })
}

fn row_to_change_item(row: &Row<'_>) -> rusqlite::Result<ChangeItem> {
    Ok(ChangeItem {
        document_id: row.get(0)?,
        extension_id: row.get(1)?,
        filename: row.get(2)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn insert_row(conn: &Connection, id: &str, doc: &NewDocument) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO documents (id, extension_id, filename, content, is_root, insertion_time, last_update_time, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
        params![
            id,
            doc.extension_id,
            doc.filename,
            doc.content,
            doc.is_root,
            to_micros(&doc.insertion_time),
            to_micros(&doc.last_update_time),
        ],
    )
}

fn into_inserted(id: String, doc: NewDocument) -> SchemaDocument {
    SchemaDocument {
        id,
        extension_id: doc.extension_id,
        filename: doc.filename,
        content: doc.content,
        is_root: doc.is_root,
        insertion_time: doc.insertion_time,
        last_update_time: doc.last_update_time,
        deleted: false,
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn insert_documents(&self, docs: Vec<NewDocument>) -> Result<Vec<SchemaDocument>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut inserted = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = Uuid::new_v4().to_string();
            if let Err(err) = insert_row(&tx, &id, &doc) {
                // The partial unique index on active (extension_id, filename)
                // rejects a second active copy; dropping the transaction rolls
                // back the rows already written.
                if is_constraint_violation(&err) {
                    return Err(Error::ExtensionAlreadyExists(doc.extension_id));
                }
                return Err(err.into());
            }
            inserted.push(into_inserted(id, doc));
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn replace_documents(
        &self,
        pairs: Vec<(SchemaDocument, NewDocument)>,
    ) -> Result<BulkReplaceResult> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let expected = pairs.len();
        let mut matched = 0;
        let mut modified = 0;
        let mut inserted = Vec::with_capacity(expected);

        for (old, new) in pairs {
            let changed = tx.execute(
                "UPDATE documents SET deleted = 1, last_update_time = ?1 WHERE id = ?2 AND deleted = 0",
                params![to_micros(&new.last_update_time), old.id],
            )?;
            matched += changed;
            modified += changed;

            let id = Uuid::new_v4().to_string();
            if let Err(err) = insert_row(&tx, &id, &new) {
                // An active successor already holds this filename: the old row
                // was replaced concurrently, so this pair's update missed too.
                if is_constraint_violation(&err) {
                    tx.rollback()?;
                    return Ok(BulkReplaceResult {
                        counts: WriteCounts { matched, modified },
                        inserted: Vec::new(),
                    });
                }
                return Err(err.into());
            }
            inserted.push(into_inserted(id, new));
        }

        // A shortfall means a concurrent writer already deactivated one of the
        // old rows. Roll back so the extension is never left partially
        // replaced; the counts still tell the caller how far the batch got.
        if matched < expected {
            tx.rollback()?;
            inserted.clear();
        } else {
            tx.commit()?;
        }

        Ok(BulkReplaceResult {
            counts: WriteCounts { matched, modified },
            inserted,
        })
    }

    fn soft_delete_extension(
        &self,
        extension_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<WriteCounts> {
        let changed = self.conn().execute(
            "UPDATE documents SET deleted = 1, last_update_time = ?1
             WHERE extension_id = ?2 AND deleted = 0",
            params![to_micros(&deleted_at), extension_id],
        )?;

        Ok(WriteCounts {
            matched: changed,
            modified: changed,
        })
    }

    fn get_document(&self, id: &str) -> Result<Option<SchemaDocument>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, extension_id, filename, content, is_root, insertion_time, last_update_time, deleted
             FROM documents WHERE id = ?1",
            params![id],
            row_to_document,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_extension_documents(
        &self,
        extension_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<SchemaDocument>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, extension_id, filename, content, is_root, insertion_time, last_update_time, deleted
             FROM documents WHERE extension_id = ?1 AND (deleted = 0 OR ?2) ORDER BY filename",
        )?;

        let rows = stmt.query_map(params![extension_id, include_deleted], row_to_document)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn find_active_by_filenames(
        &self,
        extension_id: &str,
        filenames: &[String],
    ) -> Result<HashMap<String, SchemaDocument>> {
        if filenames.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; filenames.len()].join(", ");
        let sql = format!(
            "SELECT id, extension_id, filename, content, is_root, insertion_time, last_update_time, deleted
             FROM documents WHERE extension_id = ? AND deleted = 0 AND filename IN ({placeholders})"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;

        let mut args: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(filenames.len() + 1);
        args.push(&extension_id);
        for filename in filenames {
            args.push(filename);
        }

        let rows = stmt.query_map(&args[..], row_to_document)?;
        let mut found = HashMap::new();
        for row in rows {
            let doc = row?;
            found.insert(doc.filename.clone(), doc);
        }
        Ok(found)
    }

    fn extension_exists(&self, extension_id: &str) -> Result<bool> {
        let conn = self.conn();
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE extension_id = ?1 AND deleted = 0)",
            params![extension_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn list_extension_summaries(&self) -> Result<Vec<ExtensionSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT extension_id,
                    MAX(CASE WHEN is_root = 1 THEN filename END),
                    COUNT(*),
                    MIN(insertion_time),
                    MAX(last_update_time)
             FROM documents WHERE deleted = 0
             GROUP BY extension_id ORDER BY extension_id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ExtensionSummary {
                extension_id: row.get(0)?,
                root_filename: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                document_count: row.get(2)?,
                insertion_time: from_micros(row.get(3)?),
                last_update_time: from_micros(row.get(4)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_active_items(&self) -> Result<Vec<ChangeItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, extension_id, filename FROM documents
             WHERE deleted = 0 ORDER BY extension_id, filename",
        )?;

        let rows = stmt.query_map([], row_to_change_item)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_inserted_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, extension_id, filename FROM documents
             WHERE deleted = 0 AND insertion_time > ?1
             ORDER BY extension_id, filename",
        )?;

        let rows = stmt.query_map(params![to_micros(&since)], row_to_change_item)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_modified_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, extension_id, filename FROM documents
             WHERE deleted = 0 AND last_update_time > ?1 AND insertion_time <= ?1
             ORDER BY extension_id, filename",
        )?;

        let rows = stmt.query_map(params![to_micros(&since)], row_to_change_item)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_deleted_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeItem>> {
        // One item per logical document: replaced-away generations share a
        // filename with their successor, so only the most recent deleted row
        // is reported, and only when no active successor exists (a replaced
        // or recreated document is not a deletion). SQLite resolves the bare
        // id column to the row supplying MAX(last_update_time).
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, extension_id, filename, MAX(last_update_time) FROM documents AS d
             WHERE deleted = 1 AND last_update_time > ?1 AND insertion_time <= ?1
               AND NOT EXISTS (
                   SELECT 1 FROM documents AS a
                   WHERE a.extension_id = d.extension_id
                     AND a.filename = d.filename
                     AND a.deleted = 0
               )
             GROUP BY extension_id, filename
             ORDER BY extension_id, filename",
        )?;

        let rows = stmt.query_map(params![to_micros(&since)], row_to_change_item)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
