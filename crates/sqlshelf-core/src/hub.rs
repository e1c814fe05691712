//! Facade tying storage, catalog, selection and queries together.
//!
//! One method per user intent; the transport only ever talks to this type.

use crate::{
    CatalogInspector, CoreError, FileStore, QueryExecutor, QueryLimits, Result, SelectionFlow,
    SessionRegistry,
};
use futures::Stream;
use sqlshelf_types::{
    DatabaseFile, DatabaseOverview, InfoArgs, QueryResult, SchemaReport, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for the database hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Directory holding one subdirectory per user.
    pub storage_root: PathBuf,
    pub max_upload_bytes: u64,
    pub query_limits: QueryLimits,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./user_databases"),
            max_upload_bytes: 50 * 1024 * 1024,
            query_limits: QueryLimits::default(),
        }
    }
}

/// Per-user database registry and query session.
pub struct DatabaseHub {
    store: Arc<FileStore>,
    sessions: Arc<SessionRegistry>,
    selection: SelectionFlow,
    executor: QueryExecutor,
}

impl DatabaseHub {
    /// Create a hub, making sure the storage root exists.
    pub fn new(config: HubConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.storage_root)?;
        info!(
            target: "sqlshelf::store",
            "Storing user databases under {:?}", config.storage_root
        );

        let store = Arc::new(FileStore::new(config.storage_root, config.max_upload_bytes));
        let sessions = Arc::new(SessionRegistry::new());
        let selection = SelectionFlow::new(store.clone(), sessions.clone());
        let executor = QueryExecutor::new(sessions.clone(), config.query_limits);

        Ok(Self {
            store,
            sessions,
            selection,
            executor,
        })
    }

    pub fn selection(&self) -> &SelectionFlow {
        &self.selection
    }

    /// Store an uploaded file.
    pub async fn upload<S, B, E>(&self, user: &UserId, name: &str, body: S) -> Result<DatabaseFile>
    where
        S: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.store.save(user, name, body).await
    }

    /// The user's files, unsummarized.
    pub async fn files(&self, user: &UserId) -> Result<Vec<DatabaseFile>> {
        self.store.list(user).await
    }

    /// Every file with its table count and total rows.
    ///
    /// A file that cannot be opened gets an error entry; the others are
    /// still summarized.
    pub async fn list(&self, user: &UserId) -> Result<Vec<DatabaseOverview>> {
        let files = self.store.list(user).await?;
        if files.is_empty() {
            return Err(CoreError::Empty);
        }

        let mut overview = Vec::with_capacity(files.len());
        for file in files {
            let path = file.path.clone();
            let summary = blocking(move || CatalogInspector::summarize(&path)).await;
            overview.push(match summary {
                Ok(summary) => DatabaseOverview {
                    file,
                    summary: Some(summary),
                    error: None,
                },
                Err(e) => DatabaseOverview {
                    file,
                    summary: None,
                    error: Some(e.to_string()),
                },
            });
        }
        Ok(overview)
    }

    /// Unfiltered schemas of one file (`args.index`) or of all files.
    pub async fn info(&self, user: &UserId, args: &InfoArgs) -> Result<Vec<SchemaReport>> {
        let files = self.store.list(user).await?;
        if files.is_empty() {
            return Err(CoreError::Empty);
        }

        let files = match args.index {
            Some(index) => vec![crate::file_store::pick(files, index)?],
            None => files,
        };

        let mut reports = Vec::with_capacity(files.len());
        for file in files {
            let path = file.path.clone();
            let schema = blocking(move || CatalogInspector::inspect(&path)).await;
            reports.push(match schema {
                Ok(schema) => SchemaReport {
                    file,
                    schema: Some(schema),
                    error: None,
                },
                Err(e) => SchemaReport {
                    file,
                    schema: None,
                    error: Some(e.to_string()),
                },
            });
        }
        Ok(reports)
    }

    /// Delete all of the user's files and forget their selection.
    pub async fn clear(&self, user: &UserId) -> Result<usize> {
        self.store
            .clear_all(user, || {
                self.sessions.clear(user);
                self.selection.reset(user);
            })
            .await
    }

    /// Show the numbered listing and wait for an answer.
    pub async fn begin_select(&self, user: &UserId) -> Result<Vec<DatabaseFile>> {
        self.selection.begin_selection(user).await
    }

    /// Answer a selection prompt.
    pub async fn resolve_select(&self, user: &UserId, text: &str) -> Result<DatabaseFile> {
        self.selection.resolve_index(user, text).await
    }

    /// The user's active selection.
    pub fn current(&self, user: &UserId) -> Result<DatabaseFile> {
        self.sessions.current(user)
    }

    /// Run a read-only statement against the active selection.
    pub async fn query(&self, user: &UserId, text: &str) -> Result<QueryResult> {
        let result = self.executor.execute(user, text).await;
        if let Err(e) = &result {
            debug!(target: "sqlshelf::query", "Query for user {} failed: {}", user, e);
        }
        result
    }
}

/// Run catalog work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Io(std::io::Error::other(e)))?
}
