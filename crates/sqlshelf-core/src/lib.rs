//! Core database registry and query session for sqlshelf.

mod catalog;
mod error;
mod file_store;
mod hub;
mod query;
mod selection;
mod sessions;

pub use catalog::CatalogInspector;
pub use error::CoreError;
pub use file_store::FileStore;
pub use hub::{DatabaseHub, HubConfig};
pub use query::{validate_read_only, QueryExecutor, QueryLimits, READ_ONLY_KEYWORD};
pub use selection::{SelectionFlow, SelectionState};
pub use sessions::SessionRegistry;

/// Result type for sqlshelf core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
