use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("root filename not present in upload: {0}")]
    RootNotValid(String),

    #[error("extension already exists: {0}")]
    ExtensionAlreadyExists(String),

    #[error("extension not found: {0}")]
    ExtensionNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("invalid date: {0}")]
    DateNotValid(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
