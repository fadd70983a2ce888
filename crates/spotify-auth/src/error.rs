//! Error types for Spotify OAuth operations

/// Errors from the authorization-code flow and token refresh.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("spotify: client ID is required but not provided")]
    MissingClientId,

    #[error("spotify: client secret is required but not provided")]
    MissingClientSecret,

    #[error("spotify: authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("spotify: no access code received")]
    NoAccessCode,

    #[error("spotify: state verification failed")]
    StateMismatch,

    #[error("spotify: token exchange failed: {0}")]
    TokenExchange(String),

    #[error("spotify: token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("spotify: invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("spotify: token expired and no refresh token is available")]
    NoRefreshToken,

    #[error("spotify: invalid URL: {0}")]
    InvalidUrl(String),

    #[error("spotify: building HTTP client failed: {0}")]
    HttpClient(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
