//! OAuth token model and token endpoint calls
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (completing the browser flow)
//! 2. Token refresh (on demand, from a token source)
//!
//! Both POST a form to the configured token URL with different grant types.
//! Client credentials go in an HTTP Basic header by default, or in the form
//! body with [`AuthStyle::InParams`].

use std::time::{SystemTime, UNIX_EPOCH};

use common::Secret;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::constants::EXPIRY_SKEW_MILLIS;
use crate::error::{Error, Result};

/// An issued OAuth token.
///
/// `expires_at` is a unix timestamp in milliseconds (absolute, not a delta),
/// computed from `TokenResponse.expires_in` when the token is received.
/// `None` means the provider gave no expiry and the token never expires locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token for API calls
    pub access_token: String,
    /// Almost always "Bearer"
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Refresh token for obtaining new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiration as unix timestamp in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Space separated scopes actually granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    String::from("Bearer")
}

impl Token {
    /// A bearer token with no refresh token and no expiry.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: None,
            expires_at: None,
            scope: None,
        }
    }

    /// Build a token from an endpoint response received at `now_millis`.
    pub fn from_response(response: TokenResponse, now_millis: u64) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type.unwrap_or_else(default_token_type),
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_at: response
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now_millis.saturating_add(secs.saturating_mul(1000))),
            scope: response.scope,
        }
    }

    /// Whether the token can be used right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }

    /// Whether the token is non-empty and not expiring within the skew window at `now`.
    pub fn is_valid_at(&self, now: u64) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires) => expires > now.saturating_add(EXPIRY_SKEW_MILLIS),
            None => true,
        }
    }

    /// Value for the `Authorization` header.
    ///
    /// Some providers return the type in lower case; the header always uses
    /// the canonical `Bearer` spelling.
    pub fn authorization_header(&self) -> String {
        let kind = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer")
        {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{kind} {}", self.access_token)
    }
}

/// Raw response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time. A refresh
/// response may omit `refresh_token`, in which case the old one stays valid.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// How client credentials are sent to the token endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthStyle {
    /// HTTP Basic `Authorization` header
    #[default]
    InHeader,
    /// `client_id` and `client_secret` form fields
    InParams,
}

/// Token endpoint plus the client credentials used to call it.
///
/// Shared between the authenticator and every token source it hands out.
#[derive(Debug, Clone)]
pub(crate) struct TokenEndpoint {
    pub(crate) url: Url,
    pub(crate) client_id: String,
    pub(crate) client_secret: Secret<String>,
    pub(crate) auth_style: AuthStyle,
}

/// Why a token endpoint call failed, before mapping onto [`Error`].
#[derive(Debug)]
enum EndpointFailure {
    Transport(String),
    Status(StatusCode, String),
    Decode(String),
}

impl std::fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "request failed: {e}"),
            Self::Status(status, body) => write!(f, "token endpoint returned {status}: {body}"),
            Self::Decode(e) => write!(f, "invalid token response: {e}"),
        }
    }
}

impl TokenEndpoint {
    /// Exchange an authorization code for tokens.
    pub(crate) async fn exchange(
        &self,
        http: &reqwest::Client,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Token> {
        debug!(token_url = %self.url, "exchanging authorization code");
        let response = self
            .post(
                http,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                ],
            )
            .await
            .map_err(|e| Error::TokenExchange(e.to_string()))?;

        Ok(Token::from_response(response, now_millis()))
    }

    /// Refresh an access token.
    ///
    /// 401/403 mean the refresh token was revoked or the client credentials
    /// are wrong; those surface as `InvalidCredentials`.
    pub(crate) async fn refresh(&self, http: &reqwest::Client, token: &Token) -> Result<Token> {
        let refresh = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(Error::NoRefreshToken)?;

        debug!(token_url = %self.url, "refreshing access token");
        let response = self
            .post(
                http,
                &[("grant_type", "refresh_token"), ("refresh_token", refresh)],
            )
            .await
            .map_err(|e| match e {
                EndpointFailure::Status(status, body)
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
                {
                    Error::InvalidCredentials(format!("refresh token rejected ({status}): {body}"))
                }
                other => Error::TokenRefresh(other.to_string()),
            })?;

        let mut refreshed = Token::from_response(response, now_millis());
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = token.refresh_token.clone();
        }
        Ok(refreshed)
    }

    async fn post(
        &self,
        http: &reqwest::Client,
        params: &[(&str, &str)],
    ) -> std::result::Result<TokenResponse, EndpointFailure> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        let mut request = http.post(self.url.clone());
        match self.auth_style {
            AuthStyle::InHeader => {
                request = request.basic_auth(&self.client_id, Some(self.client_secret.expose()));
            }
            AuthStyle::InParams => {
                form.push(("client_id", self.client_id.as_str()));
                form.push(("client_secret", self.client_secret.expose().as_str()));
            }
        }

        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|e| EndpointFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(EndpointFailure::Status(status, body));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| EndpointFailure::Decode(e.to_string()))?;

        if token.access_token.is_empty() {
            return Err(EndpointFailure::Decode(
                "server response missing access_token".into(),
            ));
        }
        Ok(token)
    }
}

/// Current time as a unix timestamp in milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
