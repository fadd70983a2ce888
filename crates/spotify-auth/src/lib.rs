//! Spotify OAuth2 authorization-code helper
//!
//! Builds authorization URLs, validates the redirect callback (provider
//! error, missing code, CSRF state), exchanges the code for a token, and
//! hands out token sources and HTTP clients that refresh on demand. Nothing
//! is persisted; callers own the `Token` and the state value.
//!
//! Flow:
//! 1. Build an `Authenticator` (credentials from `SPOTIFY_CLIENT_ID` /
//!    `SPOTIFY_CLIENT_SECRET` unless set on the builder)
//! 2. Generate a state with `generate_state()` and send the user to
//!    `Authenticator::authorization_url()`
//! 3. Pass the callback URL to `Authenticator::exchange_code()`
//! 4. Use the token via `Authenticator::client()` or `Authenticator::token_source()`

pub mod authenticator;
pub mod callback;
pub mod client;
pub mod constants;
pub mod env;
pub mod error;
pub mod state;
pub mod token;
pub mod token_source;

pub use authenticator::{Authenticator, AuthenticatorBuilder};
pub use callback::CallbackParams;
pub use client::AuthenticatedClient;
pub use constants::*;
pub use env::{EmptyEnv, Env, ProcessEnv};
pub use error::{Error, Result};
pub use state::generate_state;
pub use token::{AuthStyle, Token, TokenResponse};
pub use token_source::{RefreshingTokenSource, StaticTokenSource, TokenSource};
pub use url::Url;
