//! Per-user active database selection.
//!
//! Selections live only in memory: a restart returns every user to
//! "no selection".

use crate::{CoreError, Result};
use dashmap::DashMap;
use sqlshelf_types::{DatabaseFile, UserId};
use tracing::debug;

/// Maps each user to the database file their queries run against.
///
/// Holds paths into storage owned by [`crate::FileStore`], so every read
/// re-checks that the file still exists.
#[derive(Default)]
pub struct SessionRegistry {
    selections: DashMap<UserId, DatabaseFile>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the user's selection.
    pub fn select(&self, user: &UserId, file: DatabaseFile) {
        debug!(target: "sqlshelf::session", "User {} selected {}", user, file.name);
        self.selections.insert(user.clone(), file);
    }

    /// The user's current selection.
    ///
    /// A selection whose file has disappeared is dropped and reported as
    /// [`CoreError::NotSelected`].
    pub fn current(&self, user: &UserId) -> Result<DatabaseFile> {
        let file = self
            .selections
            .get(user)
            .map(|entry| entry.value().clone())
            .ok_or(CoreError::NotSelected)?;

        if !file.path.is_file() {
            self.selections
                .remove_if(user, |_, selected| selected.path == file.path);
            debug!(
                target: "sqlshelf::session",
                "Dropped dangling selection {} for user {}", file.name, user
            );
            return Err(CoreError::NotSelected);
        }

        Ok(file)
    }

    /// Forget the user's selection, if any.
    pub fn clear(&self, user: &UserId) -> bool {
        self.selections.remove(user).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stored_file(dir: &TempDir, name: &str) -> DatabaseFile {
        let path = dir.path().join(name);
        std::fs::write(&path, b"").unwrap();
        DatabaseFile {
            name: name.to_string(),
            path,
            size: 0,
            modified_at: None,
        }
    }

    #[test]
    fn test_select_overwrites() {
        let dir = TempDir::new().unwrap();
        let registry = SessionRegistry::new();
        let user = UserId::parse("1").unwrap();

        registry.select(&user, stored_file(&dir, "a.db"));
        registry.select(&user, stored_file(&dir, "b.db"));

        assert_eq!(registry.current(&user).unwrap().name, "b.db");
    }

    #[test]
    fn test_current_without_selection() {
        let registry = SessionRegistry::new();
        let user = UserId::parse("1").unwrap();
        assert!(matches!(registry.current(&user), Err(CoreError::NotSelected)));
    }

    #[test]
    fn test_clear_and_isolation() {
        let dir = TempDir::new().unwrap();
        let registry = SessionRegistry::new();
        let alice = UserId::parse("alice").unwrap();
        let bob = UserId::parse("bob").unwrap();

        registry.select(&alice, stored_file(&dir, "a.db"));
        registry.select(&bob, stored_file(&dir, "b.db"));

        assert!(registry.clear(&alice));
        assert!(!registry.clear(&alice));
        assert!(matches!(registry.current(&alice), Err(CoreError::NotSelected)));
        assert_eq!(registry.current(&bob).unwrap().name, "b.db");
    }

    #[test]
    fn test_deleted_file_is_detected() {
        let dir = TempDir::new().unwrap();
        let registry = SessionRegistry::new();
        let user = UserId::parse("1").unwrap();
        let file = stored_file(&dir, "gone.db");

        registry.select(&user, file.clone());
        std::fs::remove_file(&file.path).unwrap();

        assert!(matches!(registry.current(&user), Err(CoreError::NotSelected)));
        assert!(!registry.clear(&user));
    }
}
