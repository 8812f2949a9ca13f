pub const SCHEMA: &str = r#"
-- Schema documents: one row per physical file version.
-- Rows are never physically removed. Replacing a document inserts a new row
-- (inheriting the logical document's insertion_time) and marks the old row
-- deleted; deleting an extension marks every active row deleted. The change
-- feed reconstructs history from the two timestamps.
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    extension_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    content BLOB NOT NULL,
    is_root INTEGER NOT NULL DEFAULT 0,

    -- Unix microseconds; window predicates stay exact integer comparisons
    insertion_time INTEGER NOT NULL,
    last_update_time INTEGER NOT NULL,

    deleted INTEGER NOT NULL DEFAULT 0
);

-- Filename uniqueness is scoped to active rows so replaced and deleted
-- versions can accumulate in history. The index also turns a concurrent
-- create of the same extension into an insert failure instead of a
-- duplicate-root extension.
CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_active_filename
    ON documents(extension_id, filename) WHERE deleted = 0;

CREATE INDEX IF NOT EXISTS idx_documents_extension ON documents(extension_id);
CREATE INDEX IF NOT EXISTS idx_documents_insertion ON documents(insertion_time);
CREATE INDEX IF NOT EXISTS idx_documents_last_update ON documents(last_update_time);
"#;
