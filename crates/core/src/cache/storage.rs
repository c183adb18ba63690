//! Durable storage backends for the icon cache.
//!
//! Storage is modeled as a single key holding one serialized document,
//! matching the shape of a host key/value store. The file backend keeps
//! the record as one JSON file on disk.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;

use crate::Error;

/// One durable key of serialized cache state.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the record. `None` when the key has never been written.
    async fn read(&self) -> Result<Option<String>, Error>;

    /// Replace the record with `payload`.
    async fn write(&self, payload: &str) -> Result<(), Error>;

    /// Remove the record entirely.
    async fn remove(&self) -> Result<(), Error>;
}

/// File-backed storage: the record is one JSON file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn read(&self) -> Result<Option<String>, Error> {
        match fs::read_to_string(&self.path).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("reading {}: {}", self.path.display(), e))),
        }
    }

    async fn write(&self, payload: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("creating {}: {}", parent.display(), e)))?;
        }

        fs::write(&self.path, payload)
            .await
            .map_err(|e| Error::Storage(format!("writing {}: {}", self.path.display(), e)))
    }

    async fn remove(&self) -> Result<(), Error> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("removing {}: {}", self.path.display(), e))),
        }
    }
}

/// In-memory storage for tests and host-less operation.
#[derive(Default)]
pub struct MemoryStorage {
    record: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the record, e.g. with a corrupt payload.
    pub fn with_record(payload: impl Into<String>) -> Self {
        Self { record: Mutex::new(Some(payload.into())) }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self) -> Result<Option<String>, Error> {
        Ok(self.record.lock().expect("storage lock poisoned").clone())
    }

    async fn write(&self, payload: &str) -> Result<(), Error> {
        *self.record.lock().expect("storage lock poisoned") = Some(payload.to_string());
        Ok(())
    }

    async fn remove(&self) -> Result<(), Error> {
        *self.record.lock().expect("storage lock poisoned") = None;
        Ok(())
    }
}
