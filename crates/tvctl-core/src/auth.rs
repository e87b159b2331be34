//! Session credentials
//!
//! The gateway asks a [`TokenProvider`] for a bearer token before every
//! session-authenticated request. Acquiring and refreshing that token is the
//! provider's business; the gateway only calls it.

use std::sync::RwLock;

use crate::error::{ApiError, ApiResult};

/// Source of bearer tokens for session-authenticated requests
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid access token
    fn token(&self) -> ApiResult<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> ApiResult<String> + Send + Sync,
{
    fn token(&self) -> ApiResult<String> {
        self()
    }
}

/// A fixed token, typically read from configuration
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> ApiResult<String> {
        Ok(self.0.clone())
    }
}

/// A token that can be swapped at runtime (after login or logout)
#[derive(Debug, Default)]
pub struct SessionToken {
    access: RwLock<Option<String>>,
}

impl SessionToken {
    /// Create an empty session (not logged in)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session that already holds a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access: RwLock::new(Some(token.into())),
        }
    }

    /// Replace the current token
    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut access) = self.access.write() {
            *access = Some(token.into());
        }
    }

    /// Forget the current token
    pub fn clear(&self) {
        if let Ok(mut access) = self.access.write() {
            *access = None;
        }
    }

    pub fn is_set(&self) -> bool {
        self.access.read().map(|a| a.is_some()).unwrap_or(false)
    }
}

impl TokenProvider for SessionToken {
    fn token(&self) -> ApiResult<String> {
        let access = self
            .access
            .read()
            .map_err(|_| ApiError::Auth("session lock poisoned".to_string()))?;

        access
            .clone()
            .ok_or_else(|| ApiError::Auth("not logged in".to_string()))
    }
}
