//! Session persistence port
//!
//! Stores hold the encrypted session bundle as opaque text; encryption and
//! decryption happen in the client before anything reaches a store.
//!
//! ```rust
//! use buckler_client::session::{MemorySessionStore, SessionStore};
//!
//! # tokio_test::block_on(async {
//! let store = MemorySessionStore::new();
//! assert_eq!(store.load().await?, None);
//!
//! store.save("sealed-bundle").await?;
//! assert_eq!(store.load().await?.as_deref(), Some("sealed-bundle"));
//! # Ok::<(), buckler_client::Error>(())
//! # }).unwrap();
//! ```

use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Where an encrypted session bundle lives between runs
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored bundle, `None` when nothing has been saved
    async fn load(&self) -> Result<Option<String>>;

    /// Replace the stored bundle
    async fn save(&self, blob: &str) -> Result<()>;

    /// Forget the stored bundle
    async fn clear(&self) -> Result<()>;
}

/// Bundle kept in a single file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) if blob.trim().is_empty() => Ok(None),
            Ok(blob) => Ok(Some(blob.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, blob: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, blob).await?;
        tracing::debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    blob: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self
            .blob
            .lock()
            .map(|blob| blob.clone())
            .unwrap_or_default())
    }

    async fn save(&self, blob: &str) -> Result<()> {
        if let Ok(mut stored) = self.blob.lock() {
            *stored = Some(blob.to_string());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if let Ok(mut stored) = self.blob.lock() {
            *stored = None;
        }
        Ok(())
    }
}
