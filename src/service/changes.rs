use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::ChangeSet;

/// Computes what changed in the half-open window `(last_update, now]`.
///
/// The window start is exclusive and the timestamps it compares against are
/// produced by the reconciler, so repeated polling is gap-free without any
/// locking: a caller that feeds each response's `timestamp` back as the next
/// `last_update` sees every document exactly once per state change.
pub struct ChangeFeed {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ChangeFeed {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn change_set(&self, last_update: Option<DateTime<Utc>>) -> Result<ChangeSet> {
        let now = self.clock.now();
        if let Some(since) = last_update {
            if since > now {
                return Err(Error::DateNotValid(format!(
                    "last update {since} is in the future"
                )));
            }
        }

        let (insertions, modifications, deletions) = match last_update {
            // Without a reference point there is no window: the whole active
            // set is the snapshot and nothing can have been modified or
            // deleted "since".
            None => (self.store.list_active_items()?, Vec::new(), Vec::new()),
            Some(since) => (
                self.store.list_inserted_since(since)?,
                self.store.list_modified_since(since)?,
                self.store.list_deleted_since(since)?,
            ),
        };

        Ok(ChangeSet {
            last_update,
            timestamp: now,
            total_count: insertions.len() + modifications.len() + deletions.len(),
            insertions,
            modifications,
            deletions,
        })
    }
}
