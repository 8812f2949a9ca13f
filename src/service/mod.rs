mod changes;
mod extensions;

pub use changes::ChangeFeed;
pub use extensions::{ExtensionService, FileUpload};

use crate::error::{Error, Result};

/// Optimistic batch writes must apply exactly as many times as requested; a
/// shortfall means a lost race or a backend inconsistency and is never
/// silently ignored.
fn verify_applied(operation: &str, expected: usize, matched: usize, modified: usize) -> Result<()> {
    if matched != expected || modified != expected {
        return Err(Error::DataIntegrity(format!(
            "{operation} matched {matched} and modified {modified} documents, expected {expected}"
        )));
    }
    Ok(())
}
