//! Blob storage trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing to the local filesystem failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote object store could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote object store answered with a failure status.
    #[error("Upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Where uploaded files end up.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores `bytes` under `path` and returns the public URL or path of the
    /// stored file.
    async fn store(&self, path: &str, bytes: Vec<u8>) -> Result<String, StorageError>;
}

#[derive(Debug, Default)]
struct InMemoryStorageState {
    files: HashMap<String, Vec<u8>>,
    fail_on_store: bool,
}

/// In-memory storage for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<RwLock<InMemoryStorageState>>,
}

impl InMemoryStorage {
    pub const BASE_URL: &'static str = "memory://";

    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the storage to fail every store call.
    pub async fn set_fail_on_store(&self, fail: bool) {
        self.state.write().await.fail_on_store = fail;
    }

    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.read().await.files.get(path).cloned()
    }

    pub async fn file_count(&self) -> usize {
        self.state.read().await.files.len()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn store(&self, path: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let mut state = self.state.write().await;
        if state.fail_on_store {
            return Err(StorageError::Unavailable("store refused".to_string()));
        }

        state.files.insert(path.to_string(), bytes);
        Ok(format!("{}{path}", Self::BASE_URL))
    }
}
