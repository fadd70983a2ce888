//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret is loaded from SPOTIFY_CLIENT_SECRET or
//! client_secret_file, never stored in the TOML directly to avoid leaking it.

use common::Secret;
use serde::Deserialize;
use spotify_auth::{CLIENT_SECRET_ENV, Url};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Authorization request settings
#[derive(Debug, Deserialize)]
pub struct OAuthConfig {
    /// Must match a redirect URI registered for the Spotify application
    pub redirect_url: String,
    /// Client ID; falls back to SPOTIFY_CLIENT_ID when absent
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Force the consent dialog even for an already-approved app
    #[serde(default)]
    pub show_dialog: bool,
}

/// Local callback server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// How long to wait for the browser to come back before giving up
    #[serde(default = "default_wait")]
    pub wait_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            wait_secs: default_wait(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_wait() -> u64 {
    300
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8888))
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. SPOTIFY_CLIENT_SECRET env var, when non-empty
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        let redirect = Url::parse(&config.oauth.redirect_url).map_err(|e| {
            common::Error::Config(format!(
                "redirect_url is not a valid URL ({e}): {}",
                config.oauth.redirect_url
            ))
        })?;
        if redirect.scheme() != "http" && redirect.scheme() != "https" {
            return Err(common::Error::Config(format!(
                "redirect_url must start with http:// or https://, got: {}",
                config.oauth.redirect_url
            )));
        }

        if config.oauth.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.wait_secs == 0 {
            return Err(common::Error::Config(
                "wait_secs must be greater than 0".into(),
            ));
        }

        // An empty env var counts as unset so it can't shadow the secret file
        if let Some(secret) = std::env::var(CLIENT_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
        {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.oauth.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Path component of the redirect URL, which the callback route is served on.
    pub fn callback_path(&self) -> String {
        Url::parse(&self.oauth.redirect_url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| String::from("/callback"))
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("spotify-login.toml")
    }
}
