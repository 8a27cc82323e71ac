//! Docserve Library
//!
//! On-demand rendering, text layers, search and range streaming for
//! documents held by a remote origin. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `document`: local cache, rasterizer, text layer, search and streamer
//! - `lookup`: identifier to origin URL resolution
//! - `routes`: HTTP handlers

pub mod config;
pub mod document;
pub mod error;
pub mod lookup;
pub mod routes;
pub mod state;

use axum::{http::header, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::ACCEPT_RANGES,
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
        ]);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/documents", routes::documents::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
