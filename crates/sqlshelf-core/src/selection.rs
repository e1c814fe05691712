//! Two-step database selection: list the files, then answer with a number.
//!
//! The state is a per-user flag holding the listing shown to the user, not a
//! captured continuation; any other message may arrive in between.

use crate::file_store::pick;
use crate::{CoreError, FileStore, Result, SessionRegistry};
use dashmap::DashMap;
use sqlshelf_types::{DatabaseFile, UserId};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    AwaitingIndex,
}

pub struct SelectionFlow {
    store: Arc<FileStore>,
    sessions: Arc<SessionRegistry>,
    /// Listing shown by the last `/select`, per user awaiting an answer.
    pending: DashMap<UserId, Vec<DatabaseFile>>,
}

impl SelectionFlow {
    pub fn new(store: Arc<FileStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            store,
            sessions,
            pending: DashMap::new(),
        }
    }

    pub fn state(&self, user: &UserId) -> SelectionState {
        if self.pending.contains_key(user) {
            SelectionState::AwaitingIndex
        } else {
            SelectionState::Idle
        }
    }

    /// List the user's files and wait for a numeric answer.
    pub async fn begin_selection(&self, user: &UserId) -> Result<Vec<DatabaseFile>> {
        let files = self.store.list(user).await?;
        if files.is_empty() {
            self.pending.remove(user);
            return Err(CoreError::Empty);
        }

        debug!(target: "sqlshelf::session", "User {} choosing among {} file(s)", user, files.len());
        self.pending.insert(user.clone(), files.clone());
        Ok(files)
    }

    /// Resolve a 1-based answer and make it the user's selection.
    ///
    /// Uses the listing shown by [`SelectionFlow::begin_selection`]; without
    /// one a fresh listing is taken. On a bad index the state is unchanged so
    /// the user can retry.
    pub async fn resolve_index(&self, user: &UserId, text: &str) -> Result<DatabaseFile> {
        let shown = self.pending.get(user).map(|entry| entry.value().clone());
        let listing = match shown {
            Some(listing) => listing,
            None => {
                let files = self.store.list(user).await?;
                if files.is_empty() {
                    return Err(CoreError::Empty);
                }
                files
            }
        };

        let count = listing.len();
        let text = text.trim();
        let index: usize = text.parse().map_err(|_| CoreError::InvalidIndex {
            index: text.to_string(),
            count,
        })?;
        let file = pick(listing, index)?;

        let _guard = self.store.lock_user(user).await;
        if !file.path.is_file() {
            // The listing went stale (e.g. a clear raced the answer)
            self.pending.remove(user);
            return Err(CoreError::InvalidIndex {
                index: text.to_string(),
                count,
            });
        }

        self.sessions.select(user, file.clone());
        self.pending.remove(user);
        info!(target: "sqlshelf::session", "User {} selected {}", user, file.name);
        Ok(file)
    }

    /// Drop any pending selection for the user.
    pub fn reset(&self, user: &UserId) {
        self.pending.remove(user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        store: Arc<FileStore>,
        sessions: Arc<SessionRegistry>,
        flow: SelectionFlow,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path(), 1 << 20));
        let sessions = Arc::new(SessionRegistry::new());
        let flow = SelectionFlow::new(store.clone(), sessions.clone());
        Fixture {
            store,
            sessions,
            flow,
            _dir: dir,
        }
    }

    async fn upload(store: &FileStore, user: &UserId, name: &str) {
        let chunks: Vec<std::io::Result<Vec<u8>>> = vec![Ok(Vec::new())];
        store
            .save(user, name, futures::stream::iter(chunks))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_begin_without_files_stays_idle() {
        let f = fixture();
        let user = UserId::parse("u").unwrap();

        assert!(matches!(f.flow.begin_selection(&user).await, Err(CoreError::Empty)));
        assert_eq!(f.flow.state(&user), SelectionState::Idle);
    }

    #[tokio::test]
    async fn test_select_by_index() {
        let f = fixture();
        let user = UserId::parse("u").unwrap();
        upload(&f.store, &user, "b.db").await;
        upload(&f.store, &user, "a.db").await;

        let shown = f.flow.begin_selection(&user).await.unwrap();
        assert_eq!(shown[0].name, "a.db");
        assert_eq!(f.flow.state(&user), SelectionState::AwaitingIndex);

        let chosen = f.flow.resolve_index(&user, "2").await.unwrap();
        assert_eq!(chosen.name, "b.db");
        assert_eq!(f.flow.state(&user), SelectionState::Idle);
        assert_eq!(f.sessions.current(&user).unwrap().name, "b.db");
    }

    #[tokio::test]
    async fn test_bad_index_keeps_waiting() {
        let f = fixture();
        let user = UserId::parse("u").unwrap();
        upload(&f.store, &user, "a.db").await;
        f.flow.begin_selection(&user).await.unwrap();

        for answer in ["0", "2", "abc"] {
            let err = f.flow.resolve_index(&user, answer).await.unwrap_err();
            assert!(matches!(err, CoreError::InvalidIndex { count: 1, .. }));
            assert_eq!(f.flow.state(&user), SelectionState::AwaitingIndex);
        }
        assert!(matches!(f.sessions.current(&user), Err(CoreError::NotSelected)));

        f.flow.resolve_index(&user, "1").await.unwrap();
        assert_eq!(f.flow.state(&user), SelectionState::Idle);
    }

    #[tokio::test]
    async fn test_repeated_resolution_is_idempotent() {
        let f = fixture();
        let user = UserId::parse("u").unwrap();
        upload(&f.store, &user, "a.db").await;
        upload(&f.store, &user, "b.db").await;

        let first = f.flow.resolve_index(&user, "1").await.unwrap();
        let second = f.flow.resolve_index(&user, "1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.sessions.current(&user).unwrap(), first);
    }

    #[tokio::test]
    async fn test_idle_answer_without_files_is_empty() {
        let f = fixture();
        let user = UserId::parse("u").unwrap();
        assert!(matches!(
            f.flow.resolve_index(&user, "1").await,
            Err(CoreError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_stale_listing_is_detected() {
        let f = fixture();
        let user = UserId::parse("u").unwrap();
        upload(&f.store, &user, "a.db").await;
        f.flow.begin_selection(&user).await.unwrap();

        f.store.clear_all(&user, || {}).await.unwrap();

        assert!(matches!(
            f.flow.resolve_index(&user, "1").await,
            Err(CoreError::InvalidIndex { .. })
        ));
        assert_eq!(f.flow.state(&user), SelectionState::Idle);
        assert!(matches!(f.sessions.current(&user), Err(CoreError::NotSelected)));
    }

    #[tokio::test]
    async fn test_users_cannot_select_each_other() {
        let f = fixture();
        let alice = UserId::parse("alice").unwrap();
        let bob = UserId::parse("bob").unwrap();
        upload(&f.store, &alice, "secret.db").await;

        assert!(matches!(f.flow.begin_selection(&bob).await, Err(CoreError::Empty)));
        assert!(matches!(
            f.flow.resolve_index(&bob, "1").await,
            Err(CoreError::Empty)
        ));
        assert!(matches!(f.sessions.current(&bob), Err(CoreError::NotSelected)));
    }
}
