//! Token sources
//!
//! A token source hands out a currently usable token. The refreshing source
//! holds the last token it saw and only talks to the token endpoint once that
//! token has expired, so callers can ask for a token before every request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::token::{Token, TokenEndpoint};

/// Anything that can produce a valid token on demand.
///
/// Uses a `Pin<Box<dyn Future>>` return type so sources can be shared as
/// `Arc<dyn TokenSource>`.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<Token>> + Send + '_>>;
}

/// Always returns the same token, never refreshes.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    pub fn new(token: Token) -> Self {
        Self { token }
    }
}

impl TokenSource for StaticTokenSource {
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<Token>> + Send + '_>> {
        let token = self.token.clone();
        Box::pin(async move { Ok(token) })
    }
}

/// Token source that refreshes lazily through the authenticator's HTTP client.
///
/// The Mutex serializes callers, so when several requests find the token
/// expired at the same moment only the first performs a refresh and the rest
/// see its result. Cloning shares the same underlying token.
#[derive(Clone)]
pub struct RefreshingTokenSource {
    current: Arc<Mutex<Token>>,
    endpoint: Arc<TokenEndpoint>,
    http: reqwest::Client,
}

impl RefreshingTokenSource {
    pub(crate) fn new(token: Token, endpoint: Arc<TokenEndpoint>, http: reqwest::Client) -> Self {
        Self {
            current: Arc::new(Mutex::new(token)),
            endpoint,
            http,
        }
    }

    /// Return the held token if still valid, otherwise refresh and store the new one.
    ///
    /// On refresh failure the held token is left unchanged and the error is
    /// returned; the next call tries again.
    pub async fn current(&self) -> Result<Token> {
        let mut held = self.current.lock().await;
        if held.is_valid() {
            return Ok(held.clone());
        }

        debug!("held token expired, refreshing");
        let refreshed = self.endpoint.refresh(&self.http, &held).await?;
        *held = refreshed.clone();
        Ok(refreshed)
    }

    /// Snapshot of the held token without refreshing.
    ///
    /// Useful for persisting the latest token after a session.
    pub async fn peek(&self) -> Token {
        self.current.lock().await.clone()
    }
}

impl std::fmt::Debug for RefreshingTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshingTokenSource")
            .field("token_url", &self.endpoint.url.as_str())
            .finish_non_exhaustive()
    }
}

impl TokenSource for RefreshingTokenSource {
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<Token>> + Send + '_>> {
        Box::pin(self.current())
    }
}
