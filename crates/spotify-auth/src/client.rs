//! HTTP client that attaches the current bearer token
//!
//! Wraps the authenticator's `reqwest::Client` and a token source. Every
//! request builder it hands out already carries an `Authorization` header
//! for a valid token, refreshing first when the held token has expired.

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::{IntoUrl, Method, RequestBuilder};

use crate::error::Result;
use crate::token::Token;
use crate::token_source::TokenSource;

/// Authenticated HTTP client for calls against the Web API.
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    source: Arc<dyn TokenSource>,
}

impl AuthenticatedClient {
    /// Build from any token source.
    pub fn new(http: reqwest::Client, source: Arc<dyn TokenSource>) -> Self {
        Self { http, source }
    }

    /// Start a request with the current token attached.
    pub async fn request<U: IntoUrl>(&self, method: Method, url: U) -> Result<RequestBuilder> {
        let token = self.source.token().await?;
        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, token.authorization_header()))
    }

    pub async fn get<U: IntoUrl>(&self, url: U) -> Result<RequestBuilder> {
        self.request(Method::GET, url).await
    }

    pub async fn post<U: IntoUrl>(&self, url: U) -> Result<RequestBuilder> {
        self.request(Method::POST, url).await
    }

    pub async fn put<U: IntoUrl>(&self, url: U) -> Result<RequestBuilder> {
        self.request(Method::PUT, url).await
    }

    pub async fn delete<U: IntoUrl>(&self, url: U) -> Result<RequestBuilder> {
        self.request(Method::DELETE, url).await
    }

    /// The token that the next request would carry.
    pub async fn token(&self) -> Result<Token> {
        self.source.token().await
    }

    /// The underlying HTTP client, without token injection.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_source::StaticTokenSource;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn requests_carry_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .and(header("authorization", "Bearer at_123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = AuthenticatedClient::new(
            reqwest::Client::new(),
            Arc::new(StaticTokenSource::new(Token::new("at_123"))),
        );
        let response = client
            .get(format!("{}/v1/me", server.uri()))
            .await
            .unwrap()
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn token_source_errors_surface_before_sending() {
        struct Failing;
        impl TokenSource for Failing {
            fn token(
                &self,
            ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Token>> + Send + '_>>
            {
                Box::pin(async { Err(crate::Error::NoRefreshToken) })
            }
        }

        let client = AuthenticatedClient::new(reqwest::Client::new(), Arc::new(Failing));
        let err = client.get("http://localhost/never").await.unwrap_err();
        assert!(matches!(err, crate::Error::NoRefreshToken));
    }
}
