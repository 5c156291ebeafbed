//! # Database Facade
//!
//! [`Database`] is the public face of the store: a thin lifecycle and
//! concurrency wrapper around one [`BTree`] backed by one [`FileStore`].
//!
//! All tree operations are serialized through a reader-writer lock: `get`
//! and `traverse` share the read side, `put`, `delete`, and `close` take the
//! write side. The tree itself is single-threaded by construction; the lock
//! is the only concurrency control in the system.
//!
//! `close` detaches the tree after syncing the backing file. Any operation
//! on a closed handle fails with a "database is closed" error rather than
//! touching a dead file descriptor.

use std::path::{Path, PathBuf};

use eyre::{ensure, eyre, Result, WrapErr};
use parking_lot::RwLock;
use tracing::debug;

use crate::btree::BTree;
use crate::storage::FileStore;

pub struct Database {
    inner: RwLock<Option<BTree<FileStore>>>,
    path: PathBuf,
}

impl Database {
    /// Opens (or creates) the database file at `path`, creating missing
    /// parent directories.
    ///
    /// The root identifier is not persisted, so an existing file always
    /// opens as an empty tree; new pages are appended after old content.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let store = FileStore::open(&path)
            .wrap_err_with(|| format!("failed to open database at {}", path.display()))?;
        debug!(path = %path.display(), "db.open");
        Ok(Self {
            inner: RwLock::new(Some(BTree::new(store))),
            path,
        })
    }

    /// Inserts `key` or updates its value.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut guard = self.inner.write();
        let tree = guard
            .as_mut()
            .ok_or_else(|| self.closed_error())?;

        let cfg = tree.config();
        ensure!(
            key.len() <= cfg.max_key_size,
            "key length {} exceeds the maximum of {}",
            key.len(),
            cfg.max_key_size
        );
        ensure!(
            value.len() <= cfg.max_value_size,
            "value length {} exceeds the maximum of {}",
            value.len(),
            cfg.max_value_size
        );

        tree.insert(key, value)
    }

    /// Looks up `key`; `None` means absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let guard = self.inner.read();
        let tree = guard.as_ref().ok_or_else(|| self.closed_error())?;
        tree.search(key)
    }

    /// Removes `key` if present; deleting an absent key is a no-op.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut guard = self.inner.write();
        let tree = guard
            .as_mut()
            .ok_or_else(|| self.closed_error())?;
        tree.delete(key)?;
        Ok(())
    }

    /// Calls `visit` for every stored pair in ascending key order.
    pub fn traverse<F>(&self, visit: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        let guard = self.inner.read();
        let tree = guard.as_ref().ok_or_else(|| self.closed_error())?;
        tree.traverse(visit)
    }

    /// Syncs and closes the backing file. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.inner.write();
        if let Some(tree) = guard.take() {
            tree.store()
                .sync()
                .wrap_err_with(|| format!("failed to sync {}", self.path.display()))?;
            debug!(path = %self.path.display(), "db.close");
        }
        Ok(())
    }

    fn closed_error(&self) -> eyre::Report {
        eyre!("database {} is closed", self.path.display())
    }
}
