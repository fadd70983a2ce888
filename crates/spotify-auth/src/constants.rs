//! Spotify OAuth constants
//!
//! Fixed provider endpoints and the environment variables consulted for
//! client credentials. Client id and secret are per-application values and
//! are never compiled in.

/// Authorization endpoint the user's browser is redirected to
pub const AUTH_URL: &str = "https://accounts.spotify.com/authorize";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Environment variable holding the application's client ID
pub const CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";

/// Environment variable holding the application's client secret
pub const CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";

/// A token is treated as expired this long before its actual expiry, so a
/// request started just before the deadline doesn't carry a dead token.
pub const EXPIRY_SKEW_MILLIS: u64 = 10_000;
