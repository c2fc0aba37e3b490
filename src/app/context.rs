use std::sync::Arc;

use crate::app::error::{BrookError, Result};
use crate::config::Config;
use crate::parser::{FeedParser, HttpParser};
use crate::store::SqliteStore;

/// Wires the configured store and parser together for the front ends.
pub struct AppContext {
    pub store: SqliteStore,
    pub config: Config,
}

impl AppContext {
    /// Opens the database named by `config`, creating its directory if needed,
    /// with an HTTP parser built from the `[fetch]` settings.
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config
            .database_path()
            .map_err(|e| BrookError::Config(e.to_string()))?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let parser = HttpParser::new(config.fetch.timeout(), &config.fetch.user_agent)?;
        let store = SqliteStore::open(&db_path, Arc::new(parser))?.with_workers(config.fetch.workers);
        tracing::debug!("Using database {}", db_path.display());

        Ok(Self { store, config })
    }

    /// A context over an in-memory database and the given parser.
    pub fn in_memory(config: Config, parser: Arc<dyn FeedParser>) -> Result<Self> {
        let store = SqliteStore::in_memory(parser)?.with_workers(config.fetch.workers);
        Ok(Self { store, config })
    }
}
