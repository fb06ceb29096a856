//! The web front end: one form, one session per browser.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_core::ExpiredDeletion;
use tracing::{error, info};

use crate::constants::{SESSION_INACTIVITY_MINUTES, SESSION_SWEEP_INTERVAL_SECS};
use crate::pipeline::Pipeline;

mod csrf;
mod prelude;
mod session;
mod store;
mod views;

use store::BoundedStore;

use views::{healthz_handler, index_handler, not_found_handler, submit_handler};

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            axum::routing::get(index_handler).post(submit_handler),
        )
        .route("/healthz", axum::routing::get(healthz_handler))
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        )
        .fallback(not_found_handler)
}

fn build_app(pipeline: Pipeline, secure_cookies: bool, store: BoundedStore) -> Router {
    let session_layer = SessionManagerLayer::new(store)
        .with_secure(secure_cookies)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            SESSION_INACTIVITY_MINUTES,
        )));
    create_router()
        .with_state(AppState::new(pipeline))
        .layer(session_layer)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutting down");
}

/// Serves the campaign form until ctrl-c.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    secure_cookies: bool,
    max_sessions: usize,
    pipeline: Pipeline,
) -> Result<(), anyhow::Error> {
    info!(
        "Using text model {} and image model {}",
        pipeline.settings().text_model,
        pipeline.settings().image_model
    );
    let store = BoundedStore::new(max_sessions);
    let sweeper = tokio::task::spawn(store.clone().continuously_delete_expired(
        tokio::time::Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS),
    ));
    let app = build_app(pipeline, secure_cookies, store);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    sweeper.abort();
    Ok(())
}
