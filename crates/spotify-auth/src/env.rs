//! Environment access for credential fallback
//!
//! The builder never reads process-wide state directly. It asks an `Env`
//! implementation, so tests can supply a plain map instead of mutating the
//! real environment.

use std::collections::HashMap;

/// Source of environment-style key/value lookups.
pub trait Env: Send + Sync {
    /// Value for `key`, or `None` when unset or not valid unicode.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Env for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// An environment with nothing set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyEnv;

impl Env for EmptyEnv {
    fn var(&self, _key: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_env_returns_set_values() {
        let env = HashMap::from([("SPOTIFY_CLIENT_ID".to_string(), "abc".to_string())]);
        assert_eq!(env.var("SPOTIFY_CLIENT_ID").as_deref(), Some("abc"));
        assert_eq!(env.var("SPOTIFY_CLIENT_SECRET"), None);
    }

    #[test]
    fn empty_env_has_nothing() {
        assert_eq!(EmptyEnv.var("PATH"), None);
    }
}
