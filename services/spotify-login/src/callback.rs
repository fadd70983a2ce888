//! Redirect handler for the local login server
//!
//! Serves the path of the configured redirect URL. The first callback is
//! validated and exchanged through the authenticator, and its outcome is
//! handed to `main` over a oneshot channel. Later callbacks are refused.

use std::sync::Arc;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use spotify_auth::{Authenticator, CallbackParams, Token};
use tokio::sync::{Mutex, oneshot};
use tracing::{info, warn};

/// Outcome of the login flow delivered to `main`.
pub type LoginResult = spotify_auth::Result<Token>;

/// Shared state for the callback route.
#[derive(Clone)]
pub struct CallbackState {
    authenticator: Arc<Authenticator>,
    expected_state: Arc<str>,
    result_tx: Arc<Mutex<Option<oneshot::Sender<LoginResult>>>>,
}

impl CallbackState {
    pub fn new(
        authenticator: Arc<Authenticator>,
        expected_state: String,
    ) -> (Self, oneshot::Receiver<LoginResult>) {
        let (tx, rx) = oneshot::channel();
        let state = Self {
            authenticator,
            expected_state: expected_state.into(),
            result_tx: Arc::new(Mutex::new(Some(tx))),
        };
        (state, rx)
    }
}

/// Build the router serving `callback_path`.
pub fn build_router(state: CallbackState, callback_path: &str) -> Router {
    Router::new()
        .route(callback_path, get(callback_handler))
        .with_state(state)
}

async fn callback_handler(
    State(state): State<CallbackState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    // Holding the lock across the exchange keeps a second, concurrent
    // callback from racing the first.
    let mut slot = state.result_tx.lock().await;
    let Some(tx) = slot.take() else {
        warn!("callback received after login already completed");
        return (StatusCode::CONFLICT, String::from("Login already completed."));
    };

    let params = CallbackParams::from_query(query.as_deref().unwrap_or_default());
    let result = state
        .authenticator
        .exchange_callback(&state.expected_state, params)
        .await;

    let response = match &result {
        Ok(_) => {
            info!("authorization code exchanged");
            (
                StatusCode::OK,
                String::from("Login complete. You can close this tab."),
            )
        }
        Err(e) => {
            warn!(error = %e, "login failed");
            (StatusCode::BAD_REQUEST, format!("Login failed: {e}"))
        }
    };

    let _ = tx.send(result);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use spotify_auth::{EmptyEnv, Error};
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn authenticator(server: &MockServer) -> Arc<Authenticator> {
        Mock::given(method("POST"))
            .and(body_string_contains("code=good-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at_login",
                "refresh_token": "rt_login",
                "expires_in": 3600
            })))
            .mount(server)
            .await;

        Arc::new(
            Authenticator::builder("http://127.0.0.1:8888/callback")
                .env(EmptyEnv)
                .client_id("id")
                .client_secret("secret")
                .token_url(format!("{}/api/token", server.uri()))
                .build()
                .unwrap(),
        )
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn successful_callback_delivers_token() {
        let server = MockServer::start().await;
        let (state, rx) = CallbackState::new(authenticator(&server).await, "xyz".into());
        let router = build_router(state, "/callback");

        let (status, body) = get(router, "/callback?code=good-code&state=xyz").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Login complete"));

        let token = rx.await.unwrap().unwrap();
        assert_eq!(token.access_token, "at_login");
        assert_eq!(token.refresh_token.as_deref(), Some("rt_login"));
    }

    #[tokio::test]
    async fn denied_callback_delivers_error() {
        let server = MockServer::start().await;
        let (state, rx) = CallbackState::new(authenticator(&server).await, "xyz".into());
        let router = build_router(state, "/callback");

        let (status, body) = get(router, "/callback?error=access_denied&state=xyz").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("access_denied"), "got: {body}");
        assert!(matches!(
            rx.await.unwrap(),
            Err(Error::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn forged_state_is_rejected() {
        let server = MockServer::start().await;
        let (state, rx) = CallbackState::new(authenticator(&server).await, "xyz".into());
        let router = build_router(state, "/callback");

        let (status, _) = get(router, "/callback?code=good-code&state=evil").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(matches!(rx.await.unwrap(), Err(Error::StateMismatch)));
    }

    #[tokio::test]
    async fn second_callback_is_refused() {
        let server = MockServer::start().await;
        let (state, _rx) = CallbackState::new(authenticator(&server).await, "xyz".into());
        let router = build_router(state, "/callback");

        let (first, _) = get(router.clone(), "/callback?code=good-code&state=xyz").await;
        assert_eq!(first, StatusCode::OK);
        let (second, _) = get(router, "/callback?code=good-code&state=xyz").await;
        assert_eq!(second, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let server = MockServer::start().await;
        let (state, _rx) = CallbackState::new(authenticator(&server).await, "xyz".into());
        let router = build_router(state, "/callback");

        let (status, _) = get(router, "/elsewhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
