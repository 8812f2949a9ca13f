//! # Schemakeep
//!
//! A store for versioned XML schema extensions, usable both as a standalone
//! binary and as a library. An extension is a named group of schema documents
//! with exactly one root; documents are replaced and deleted by versioning
//! soft-deleted rows, and a change feed lets consumers poll for insertions,
//! modifications, and deletions since a given timestamp.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use schemakeep::clock::SystemClock;
//! use schemakeep::server::{AppState, create_router};
//! use schemakeep::service::{ChangeFeed, ExtensionService};
//! use schemakeep::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/schemakeep.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let store: Arc<dyn Store> = Arc::new(store);
//! let clock: Arc<dyn schemakeep::clock::Clock> = Arc::new(SystemClock);
//!
//! let state = Arc::new(AppState {
//!     extensions: ExtensionService::new(store.clone(), clock.clone()),
//!     changes: ChangeFeed::new(store, clock),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
