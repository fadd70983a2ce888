//! Spotify login helper
//!
//! Single-binary tool that runs one authorization-code flow:
//! 1. Prints the Spotify authorization URL
//! 2. Listens on the redirect URL for the callback
//! 3. Validates state and exchanges the code
//! 4. Writes the resulting token as JSON to stdout

mod callback;
mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use spotify_auth::{Authenticator, generate_state};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::callback::{CallbackState, build_router};
use crate::config::Config;

/// How long in-flight callback responses get to finish after the token arrives
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr; stdout carries only the token
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let authenticator = Arc::new(
        build_authenticator(&config).context("failed to configure Spotify authenticator")?,
    );

    info!(
        listen_addr = %config.server.listen_addr,
        redirect_url = %config.oauth.redirect_url,
        scopes = config.oauth.scopes.len(),
        "configuration loaded"
    );

    let state = generate_state();
    let auth_url = authenticator.authorization_url_with_dialog(&state, config.oauth.show_dialog);
    eprintln!("Open this URL in your browser to log in:\n\n{auth_url}\n");

    let (callback_state, result_rx) = CallbackState::new(authenticator, state);
    let app = build_router(callback_state, &config.callback_path());

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "waiting for callback");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let wait = Duration::from_secs(config.server.wait_secs);
    let outcome = tokio::select! {
        result = tokio::time::timeout(wait, result_rx) => result,
        _ = shutdown_signal() => {
            warn!("interrupted before callback arrived");
            let _ = shutdown_tx.send(());
            anyhow::bail!("login interrupted");
        }
    };

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("callback server stopped"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!("drain timeout exceeded, forcing shutdown"),
    }

    let token = outcome
        .with_context(|| format!("no callback received within {}s", wait.as_secs()))?
        .context("callback server stopped before delivering a result")?
        .context("login failed")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&token).context("serializing token")?
    );
    info!("login complete");
    Ok(())
}

/// Build the authenticator from loaded config.
///
/// Values from the config are passed explicitly; anything left unset falls
/// back to SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET inside the builder.
fn build_authenticator(config: &Config) -> spotify_auth::Result<Authenticator> {
    let mut builder = Authenticator::builder(&config.oauth.redirect_url)
        .scopes(config.oauth.scopes.iter().cloned())
        .timeout(Duration::from_secs(config.oauth.timeout_secs));
    if let Some(id) = &config.oauth.client_id {
        builder = builder.client_id(id.clone());
    }
    if let Some(secret) = &config.oauth.client_secret {
        builder = builder.client_secret(secret.expose().clone());
    }
    builder.build()
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
