//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/process` - Upload a file with a prompt, get the model's answer
//! - `/health` - Health check
//! - `/protected` - Access-checked echo of the caller
//! - `/` - Static file serving (frontend)

pub mod health;
pub mod process;
pub mod protected;
pub mod static_files;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
///
/// API routes take precedence; anything else falls through to the static
/// directory.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server);
    let static_dir = state.config.server.static_dir.clone();

    let api_router = Router::new()
        .merge(process::router(state.clone()))
        .merge(protected::router(state))
        .merge(health::router());

    Router::new()
        .merge(api_router)
        .merge(static_files::router(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
