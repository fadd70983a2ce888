//! Parsing of the authorization callback
//!
//! After the user approves (or denies) access, Spotify redirects the browser
//! to the redirect URL with `code` and `state`, or with `error`.

use url::Url;

/// Query parameters recognized on the redirect back from the provider.
///
/// Empty values are treated the same as absent ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse from a raw query string (without the leading `?`).
    ///
    /// When a key repeats, the first occurrence wins.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// Parse from the full callback URL.
    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_and_state() {
        let url = Url::parse("http://localhost/callback?state=test-state&code=test-code").unwrap();
        let params = CallbackParams::from_url(&url);
        assert_eq!(params.code.as_deref(), Some("test-code"));
        assert_eq!(params.state.as_deref(), Some("test-state"));
        assert!(params.error.is_none());
    }

    #[test]
    fn parses_provider_error() {
        let params = CallbackParams::from_query("error=access_denied&state=s");
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert!(params.code.is_none());
    }

    #[test]
    fn decodes_percent_escapes() {
        let params =
            CallbackParams::from_query("error=invalid_scope&error_description=bad%20scope+name");
        assert_eq!(params.error_description.as_deref(), Some("bad scope name"));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let params = CallbackParams::from_query("code=&state=");
        assert!(params.code.is_none());
        assert!(params.state.is_none());
    }

    #[test]
    fn url_without_query_yields_nothing() {
        let url = Url::parse("http://localhost/callback").unwrap();
        assert_eq!(CallbackParams::from_url(&url), CallbackParams::default());
    }

    #[test]
    fn first_occurrence_wins() {
        let params = CallbackParams::from_query("code=first&code=second");
        assert_eq!(params.code.as_deref(), Some("first"));
    }
}
