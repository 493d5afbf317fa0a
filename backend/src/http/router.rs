//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use std::future::IntoFuture;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // The frontend is served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/appinfo", get(handlers::app_info))
        .route("/telescope", get(handlers::telescope_status))
        // Sky
        .route("/sky/zenith", get(handlers::zenith))
        .route("/sky/check", post(handlers::check_coordinates))
        // Plans
        .route(
            "/plans",
            get(handlers::list_plans).post(handlers::submit_plan),
        )
        .route("/plans/executed", get(handlers::list_executed_plans))
        .route("/plans/{id}", delete(handlers::delete_plan))
        .route("/plans/{id}/check", post(handlers::check_plan))
        .route("/plans/{id}/execute", post(handlers::execute_plan))
        // Reservations and users
        .route(
            "/reservations",
            get(handlers::list_reservations).post(handlers::create_reservation),
        )
        .route("/reservations/{id}", delete(handlers::delete_reservation))
        .route("/users", get(handlers::list_users));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("HTTP server failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Telescope monitor stopped: {0}")]
    MonitorFailed(#[from] JoinError),

    #[error("Telescope monitor exited")]
    MonitorExited,
}

/// Serve `app` until either the server or the monitor task ends.
pub async fn serve_with_monitor(
    listener: TcpListener,
    app: Router,
    monitor: JoinHandle<()>,
) -> Result<(), ServeError> {
    tokio::select! {
        served = axum::serve(listener, app).into_future() => Ok(served?),
        stopped = monitor => {
            stopped?;
            Err(ServeError::MonitorExited)
        }
    }
}
