//! Shared application state.

use crate::config::Config;
use sqlshelf_core::DatabaseHub;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub hub: Arc<DatabaseHub>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> sqlshelf_core::Result<Self> {
        let hub = Arc::new(DatabaseHub::new(config.hub_config())?);
        Ok(Self { hub, config })
    }
}
