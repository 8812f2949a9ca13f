mod changes;
pub mod dto;
mod extensions;
pub mod response;
mod router;
pub mod validation;

pub use changes::changes_router;
pub use extensions::extensions_router;
pub use router::{AppState, create_router};
