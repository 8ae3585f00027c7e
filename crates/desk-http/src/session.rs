//! Session token access
//!
//! The token is owned by the host application. The client only reads it,
//! once per request.

use std::fmt::Debug;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::HttpError;
use crate::Result;

/// Read-only view of the host's session store
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    /// Current session token, `None` when signed out
    async fn token(&self) -> Result<Option<String>>;
}

/// Session store without a session
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

#[async_trait]
impl SessionStore for NoSession {
    async fn token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// In-memory session store for hosts that keep the token in process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: RwLock<Option<String>>,
}

impl MemorySessionStore {
    /// Create a store holding `token`
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Replace the token
    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        let mut guard = self.token.write().map_err(|_| poisoned())?;
        *guard = Some(token.into());
        Ok(())
    }

    /// Drop the token
    pub fn clear(&self) -> Result<()> {
        let mut guard = self.token.write().map_err(|_| poisoned())?;
        *guard = None;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn token(&self) -> Result<Option<String>> {
        let guard = self.token.read().map_err(|_| poisoned())?;
        Ok(guard.clone())
    }
}

fn poisoned() -> HttpError {
    HttpError::Interceptor("session store lock poisoned".to_string())
}
