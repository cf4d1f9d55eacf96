//! Determination API - backend for report drafts
//!
//! Provides REST endpoints for:
//! - The exemption rule table
//! - Report drafts and record autosave
//! - Server-side reportability determination
//! - The per-report audit chain

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::ApiError;
pub use state::{AppState, Clock, FixedClock, SystemClock};

/// Build the application router
pub fn app(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Rule table
        .route("/api/exemptions", get(handlers::list_exemptions))
        // Report drafts
        .route("/api/reports", post(handlers::create_report))
        .route("/api/reports/:id", get(handlers::get_report))
        .route("/api/reports/:id/record", put(handlers::save_record))
        // Determination
        .route("/api/reports/:id/determine", post(handlers::determine))
        .route("/api/reports/:id/audit", get(handlers::get_audit))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
