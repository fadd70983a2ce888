//! Authorization-code flow for the Spotify Web API
//!
//! `Authenticator` holds the client configuration and an HTTP client. It
//! builds the URL the user is sent to, validates the callback, exchanges the
//! code for a token, and hands out token sources and authenticated clients
//! that refresh through the same HTTP client.
//!
//! Flow:
//! 1. Caller generates a state (e.g. `state::generate_state()`) and keeps it
//! 2. User is sent to `authorization_url(&state)`
//! 3. Spotify redirects to the redirect URL; caller passes that URL to `exchange_code()`
//! 4. Resulting `Token` feeds `client()` or `token_source()`

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use url::Url;

use crate::callback::CallbackParams;
use crate::client::AuthenticatedClient;
use crate::constants::{AUTH_URL, CLIENT_ID_ENV, CLIENT_SECRET_ENV, TOKEN_URL};
use crate::env::{Env, ProcessEnv};
use crate::error::{Error, Result};
use crate::token::{AuthStyle, Token, TokenEndpoint};
use crate::token_source::RefreshingTokenSource;

/// OAuth2 authorization-code helper.
#[derive(Debug, Clone)]
pub struct Authenticator {
    auth_url: Url,
    redirect_url: String,
    scopes: Vec<String>,
    offline_access: bool,
    endpoint: Arc<TokenEndpoint>,
    http: reqwest::Client,
}

/// Builder for [`Authenticator`].
///
/// Client ID and secret fall back to `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET`
/// from the configured [`Env`] when not set explicitly. An explicit non-empty
/// value always wins, whatever order the builder methods are called in.
/// `http_client` and `timeout` both replace the HTTP client; the last call wins.
pub struct AuthenticatorBuilder {
    redirect_url: String,
    client_id: Option<String>,
    client_secret: Option<Secret<String>>,
    scopes: Vec<String>,
    auth_url: String,
    token_url: String,
    offline_access: bool,
    auth_style: AuthStyle,
    http: Option<reqwest::Client>,
    timeout: Option<Duration>,
    env: Box<dyn Env>,
}

impl AuthenticatorBuilder {
    fn new(redirect_url: impl Into<String>) -> Self {
        Self {
            redirect_url: redirect_url.into(),
            client_id: None,
            client_secret: None,
            scopes: Vec::new(),
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            offline_access: true,
            auth_style: AuthStyle::default(),
            http: None,
            timeout: None,
            env: Box::new(ProcessEnv),
        }
    }

    /// Set the client ID, overriding the environment.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set the client secret, overriding the environment.
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(Secret::new(secret.into()));
        self
    }

    /// Replace the redirect URL given to `Authenticator::builder`.
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = url.into();
        self
    }

    /// Scopes requested by `authorization_url`.
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Use a caller-provided HTTP client for exchange and refresh.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self.timeout = None;
        self
    }

    /// Use a fresh HTTP client with the given request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.http = None;
        self
    }

    /// Override the authorization endpoint.
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Override the token endpoint.
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Whether authorization URLs ask for offline access (a refresh token). On by default.
    pub fn offline_access(mut self, enabled: bool) -> Self {
        self.offline_access = enabled;
        self
    }

    /// How client credentials are sent to the token endpoint.
    pub fn auth_style(mut self, style: AuthStyle) -> Self {
        self.auth_style = style;
        self
    }

    /// Where credential fallbacks are read from. Defaults to the process environment.
    pub fn env(mut self, env: impl Env + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Resolve credentials and build the authenticator.
    ///
    /// Fails with `MissingClientId` before considering the secret, then
    /// `MissingClientSecret`, then `InvalidUrl` for a malformed endpoint.
    pub fn build(self) -> Result<Authenticator> {
        let client_id = self
            .client_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.env.var(CLIENT_ID_ENV))
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingClientId)?;

        let client_secret = self
            .client_secret
            .filter(|secret| !secret.is_empty())
            .or_else(|| self.env.var(CLIENT_SECRET_ENV).map(Secret::new))
            .filter(|secret| !secret.is_empty())
            .ok_or(Error::MissingClientSecret)?;

        let auth_url = Url::parse(&self.auth_url)
            .map_err(|e| Error::InvalidUrl(format!("auth_url {}: {e}", self.auth_url)))?;
        let token_url = Url::parse(&self.token_url)
            .map_err(|e| Error::InvalidUrl(format!("token_url {}: {e}", self.token_url)))?;

        let http = match (self.http, self.timeout) {
            (Some(client), _) => client,
            (None, Some(timeout)) => reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::HttpClient(e.to_string()))?,
            (None, None) => reqwest::Client::new(),
        };

        Ok(Authenticator {
            auth_url,
            redirect_url: self.redirect_url,
            scopes: self.scopes,
            offline_access: self.offline_access,
            endpoint: Arc::new(TokenEndpoint {
                url: token_url,
                client_id,
                client_secret,
                auth_style: self.auth_style,
            }),
            http,
        })
    }
}

impl Authenticator {
    /// Start building an authenticator for the given redirect URL.
    pub fn builder(redirect_url: impl Into<String>) -> AuthenticatorBuilder {
        AuthenticatorBuilder::new(redirect_url)
    }

    /// Build with defaults: credentials from the process environment, default HTTP client.
    pub fn new(redirect_url: impl Into<String>) -> Result<Self> {
        Self::builder(redirect_url).build()
    }

    pub fn client_id(&self) -> &str {
        &self.endpoint.client_id
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Replace the configured scopes for all later authorization URLs.
    pub fn set_scopes<I, S>(&mut self, scopes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
    }

    /// URL of the authorization page the user should be sent to.
    ///
    /// `state` is returned unchanged in the callback and must be checked by
    /// `exchange_code`.
    pub fn authorization_url(&self, state: &str) -> String {
        self.build_authorization_url(state, &self.scopes, false)
    }

    /// Like `authorization_url` but requesting `scopes` for this call only.
    /// The configured scopes are left untouched.
    pub fn authorization_url_with_scopes<S: AsRef<str>>(
        &self,
        state: &str,
        scopes: &[S],
    ) -> String {
        self.build_authorization_url(state, scopes, false)
    }

    /// Authorization URL that forces the consent dialog even if the user
    /// already approved this application.
    pub fn authorization_url_with_dialog(&self, state: &str, show_dialog: bool) -> String {
        self.build_authorization_url(state, &self.scopes, show_dialog)
    }

    fn build_authorization_url<S: AsRef<str>>(
        &self,
        state: &str,
        scopes: &[S],
        show_dialog: bool,
    ) -> String {
        let mut url = self.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            if self.offline_access {
                query.append_pair("access_type", "offline");
            }
            query
                .append_pair("client_id", &self.endpoint.client_id)
                .append_pair("redirect_uri", &self.redirect_url)
                .append_pair("response_type", "code");
            if !scopes.is_empty() {
                let joined = scopes
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(" ");
                query.append_pair("scope", &joined);
            }
            if show_dialog {
                query.append_pair("show_dialog", "true");
            }
            query.append_pair("state", state);
        }
        url.into()
    }

    /// Exchange the authorization code in a callback URL for a token.
    ///
    /// `expected_state` must be the value passed to `authorization_url` for
    /// this flow.
    pub async fn exchange_code(&self, expected_state: &str, callback: &Url) -> Result<Token> {
        self.exchange_callback(expected_state, CallbackParams::from_url(callback))
            .await
    }

    /// Same as `exchange_code` for callers that already parsed the query.
    ///
    /// Checks run in order: provider error, missing code, state mismatch.
    /// There is no single-use tracking; each call performs an exchange.
    pub async fn exchange_callback(
        &self,
        expected_state: &str,
        params: CallbackParams,
    ) -> Result<Token> {
        if let Some(error) = params.error.filter(|e| !e.is_empty()) {
            let message = match params.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error,
            };
            return Err(Error::AuthenticationFailed(message));
        }

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(Error::NoAccessCode)?;

        if params.state.as_deref().unwrap_or_default() != expected_state {
            return Err(Error::StateMismatch);
        }

        self.endpoint
            .exchange(&self.http, &code, &self.redirect_url)
            .await
    }

    /// Refresh `token` once, without keeping it.
    pub async fn refresh(&self, token: &Token) -> Result<Token> {
        self.endpoint.refresh(&self.http, token).await
    }

    /// Token source seeded with `token` that refreshes through this authenticator's client.
    pub fn token_source(&self, token: Token) -> RefreshingTokenSource {
        RefreshingTokenSource::new(token, Arc::clone(&self.endpoint), self.http.clone())
    }

    /// HTTP client that attaches `token` to requests and refreshes it when expired.
    pub fn client(&self, token: Token) -> AuthenticatedClient {
        AuthenticatedClient::new(self.http.clone(), Arc::new(self.token_source(token)))
    }

    /// The HTTP client used for token endpoint calls.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }
}
