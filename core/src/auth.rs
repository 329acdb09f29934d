//! Bearer-token acquisition and caching.
//!
//! # Design
//! A `TokenProvider` knows how to obtain a token; `TokenCache` holds the one
//! token shared by every call made through a `CloudApi`. The cache lock is
//! held while the provider runs, so concurrent callers wait for a single
//! acquisition instead of each fetching their own.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::error::ApiError;

/// Environment variable read by `EnvTokenProvider`.
pub const TOKEN_ENV: &str = "SWIFT_CLOUD_API_TOKEN";

/// A bearer token, optionally with an expiry instant.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    expires_at: Option<SystemTime>,
}

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: SystemTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// Never print the credential itself.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens.
pub trait TokenProvider {
    fn acquire_token(&self) -> Result<AuthToken, ApiError>;
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: AuthToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AuthToken::new(token),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn acquire_token(&self) -> Result<AuthToken, ApiError> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every acquisition.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(TOKEN_ENV)
    }
}

impl TokenProvider for EnvTokenProvider {
    fn acquire_token(&self) -> Result<AuthToken, ApiError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => Ok(AuthToken::new(value.trim())),
            _ => Err(ApiError::Authentication(format!(
                "no credentials found; set the {} environment variable",
                self.var
            ))),
        }
    }
}

/// The token shared by all calls through one client.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: Mutex<Option<AuthToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token, acquiring a new one from `provider` when the
    /// cache is empty or the cached token has expired.
    pub fn get_or_acquire(&self, provider: &dyn TokenProvider) -> Result<AuthToken, ApiError> {
        let mut slot = self.lock();
        if let Some(token) = slot.as_ref() {
            if !token.is_expired(SystemTime::now()) {
                return Ok(token.clone());
            }
            tracing::debug!("cached token expired");
        }
        let token = provider.acquire_token()?;
        tracing::debug!("acquired new bearer token");
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next call acquires a fresh one.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    pub fn is_cached(&self) -> bool {
        self.lock().is_some()
    }

    // The slot is only written after a successful acquisition, so a provider
    // that panicked mid-fetch leaves it consistent.
    fn lock(&self) -> MutexGuard<'_, Option<AuthToken>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
