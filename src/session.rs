use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

const TOKEN_FILE: &str = "session.token";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Token store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable storage for the bearer token, so a session can outlive the process.
///
/// The in-process token cache in [`Session`] is authoritative once restored;
/// the store is only consulted at startup and written through on changes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, SessionError>;
    async fn save(&self, token: &str) -> Result<(), SessionError>;
    async fn clear(&self) -> Result<(), SessionError>;
}

/// Keeps the token for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.token.write().await = Some(token.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        *self.token.write().await = None;
        Ok(())
    }
}

/// Persists the token as a single file under a configured directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(TOKEN_FILE),
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>, SessionError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_owned()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, token).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Explicit session context handed to the API client at construction.
///
/// Header injection happens per-request from this object; there is no global
/// default-header mutation anywhere in the crate.
#[derive(Clone)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
    store: Arc<dyn TokenStore>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            store,
        }
    }

    /// A session backed by a process-local store, the default for tests and
    /// embedders that do not want a token on disk.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::default()))
    }

    /// Loads a previously persisted token, if any. Returns whether a token was
    /// found.
    pub async fn restore(&self) -> Result<bool, SessionError> {
        let stored = self.store.load().await?;
        let found = stored.is_some();
        if found {
            debug!("Restored persisted session token");
        }
        *self.token.write().await = stored;
        Ok(found)
    }

    pub async fn set_token(&self, token: impl Into<String>) -> Result<(), SessionError> {
        let token = token.into();
        self.store.save(&token).await?;
        *self.token.write().await = Some(token);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        self.store.clear().await?;
        *self.token.write().await = None;
        Ok(())
    }

    /// Current token for an `Authorization: Bearer` header.
    pub async fn bearer(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
