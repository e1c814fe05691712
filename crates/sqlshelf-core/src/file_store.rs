//! Per-user storage of uploaded database files.
//!
//! Layout: `<root>/<user id>/<file name>`. Uploads stream into a hidden
//! `.upload-<uuid>.partial` file and are renamed into place under the user's
//! lock, so a listing never observes a half-written database.

use crate::{CoreError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use sqlshelf_types::{has_recognized_extension, DatabaseFile, UserId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

const PARTIAL_PREFIX: &str = ".upload-";
const PARTIAL_SUFFIX: &str = ".partial";
const STALE_PARTIAL_AGE: Duration = Duration::from_secs(60 * 60);

/// Filesystem-backed registry of every user's database files.
pub struct FileStore {
    root: PathBuf,
    max_upload_bytes: u64,
    /// One lock per user; unrelated users never contend.
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, max_upload_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes,
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, user: &UserId) -> PathBuf {
        self.root.join(user.as_str())
    }

    /// Create the user's directory if needed and return it.
    pub async fn ensure_user_directory(&self, user: &UserId) -> Result<PathBuf> {
        let dir = self.user_dir(user);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Acquire the user's storage lock.
    pub async fn lock_user(&self, user: &UserId) -> UserGuard<'_> {
        let lock = self.locks.entry(user.clone()).or_default().clone();
        UserGuard {
            guard: Some(lock.lock_owned().await),
            store: self,
            user: user.clone(),
        }
    }

    /// Persist an uploaded file.
    ///
    /// Never overwrites: an existing file of the same name yields
    /// [`CoreError::Duplicate`] and is left untouched.
    pub async fn save<S, B, E>(&self, user: &UserId, name: &str, stream: S) -> Result<DatabaseFile>
    where
        S: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        validate_file_name(name)?;
        let dir = self.ensure_user_directory(user).await?;
        let target = dir.join(name);

        // Cheap early rejection; the authoritative check happens under the lock.
        if fs::try_exists(&target).await? {
            return Err(CoreError::Duplicate(name.to_string()));
        }

        let partial = dir.join(format!("{PARTIAL_PREFIX}{}{PARTIAL_SUFFIX}", Uuid::new_v4()));
        let written = match self.write_partial(&partial, stream).await {
            Ok(written) => written,
            Err(e) => {
                discard_partial(&partial).await;
                return Err(e);
            }
        };

        let _guard = self.lock_user(user).await;
        if fs::try_exists(&target).await? {
            discard_partial(&partial).await;
            return Err(CoreError::Duplicate(name.to_string()));
        }
        if let Err(e) = fs::rename(&partial, &target).await {
            discard_partial(&partial).await;
            return Err(e.into());
        }

        info!(
            target: "sqlshelf::store",
            "Saved {} for user {} ({} bytes)", name, user, written
        );
        describe(name.to_string(), target).await
    }

    async fn write_partial<S, B, E>(&self, path: &Path, mut stream: S) -> Result<u64>
    where
        S: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(std::io::Error::other)?;
            let bytes = chunk.as_ref();
            written += bytes.len() as u64;
            if written > self.max_upload_bytes {
                return Err(CoreError::UploadTooLarge {
                    limit: self.max_upload_bytes,
                });
            }
            file.write_all(bytes).await?;
        }

        file.sync_all().await?;
        Ok(written)
    }

    /// The user's database files, sorted by name.
    pub async fn list(&self, user: &UserId) -> Result<Vec<DatabaseFile>> {
        let dir = self.ensure_user_directory(user).await?;
        let _guard = self.lock_user(user).await;
        list_dir(&dir).await
    }

    /// Look up a file by its 1-based position in [`FileStore::list`].
    pub async fn resolve(&self, user: &UserId, index: usize) -> Result<DatabaseFile> {
        let files = self.list(user).await?;
        pick(files, index)
    }

    /// Delete every stored file of the user.
    ///
    /// `invalidate` runs under the user's lock before any file is removed, so
    /// callers can drop selections that point into this directory without a
    /// concurrent selection slipping in between. In-flight uploads are left
    /// alone; partial files older than an hour are leftovers of an aborted
    /// process and are removed.
    pub async fn clear_all<F>(&self, user: &UserId, invalidate: F) -> Result<usize>
    where
        F: FnOnce(),
    {
        let dir = self.ensure_user_directory(user).await?;
        let _guard = self.lock_user(user).await;
        invalidate();

        let mut removed = 0;
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_partial(&name) {
                let age = entry.metadata().await?.modified()?.elapsed();
                if age.is_ok_and(|age| age > STALE_PARTIAL_AGE) {
                    debug!(target: "sqlshelf::store", "Removing abandoned upload {}", name);
                    discard_partial(&entry.path()).await;
                }
                continue;
            }
            fs::remove_file(entry.path()).await?;
            removed += 1;
        }

        info!(
            target: "sqlshelf::store",
            "Cleared {} file(s) for user {}", removed, user
        );
        Ok(removed)
    }
}

/// Holds a user's storage lock; the lock entry is dropped once nobody else
/// holds or waits on it.
pub struct UserGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    store: &'a FileStore,
    user: UserId,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone of the Arc, so a count of 1 means only the map
        // refers to it. The check runs under the shard lock that `entry` takes.
        self.store
            .locks
            .remove_if(&self.user, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Pick the 1-based `index` out of a listing.
pub(crate) fn pick(files: Vec<DatabaseFile>, index: usize) -> Result<DatabaseFile> {
    let count = files.len();
    index
        .checked_sub(1)
        .and_then(|i| files.into_iter().nth(i))
        .ok_or(CoreError::InvalidIndex {
            index: index.to_string(),
            count,
        })
}

fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_name(name, "name cannot be empty"));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(CoreError::invalid_name(name, "name cannot contain path separators"));
    }
    if name.starts_with('.') {
        return Err(CoreError::invalid_name(name, "name cannot start with '.'"));
    }
    if !has_recognized_extension(name) {
        return Err(CoreError::invalid_name(name, "expected a .db or .sqlite file"));
    }
    Ok(())
}

fn is_partial(name: &str) -> bool {
    name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX)
}

async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(target: "sqlshelf::store", "Failed to remove {:?}: {}", path, e);
        }
    }
}

async fn list_dir(dir: &Path) -> Result<Vec<DatabaseFile>> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !has_recognized_extension(&name) {
            continue;
        }
        if !entry.file_type().await?.is_file() {
            continue;
        }
        files.push(describe(name, entry.path()).await?);
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(target: "sqlshelf::store", "Listed {} file(s) in {:?}", files.len(), dir);
    Ok(files)
}

async fn describe(name: String, path: PathBuf) -> Result<DatabaseFile> {
    let metadata = fs::metadata(&path).await?;
    let modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);
    Ok(DatabaseFile {
        name,
        path,
        size: metadata.len(),
        modified_at,
    })
}
