use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod cleanup;
pub mod config;
pub mod handlers;
pub mod models;
pub mod storage;

use handlers::{health_handler, list_videos_handler, upload_handler};
use models::AppState;

/// Build the application router.
pub fn app(state: Arc<AppState>) -> Router {
    let allowed_headers = [
        header::ACCEPT,
        header::CONTENT_TYPE,
        header::CONTENT_LENGTH,
        header::ACCEPT_ENCODING,
        header::AUTHORIZATION,
        HeaderName::from_static("x-csrf-token"),
    ];

    let upload_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(allowed_headers.clone());

    let list_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(allowed_headers);

    Router::new()
        .route("/upload", post(upload_handler).layer(upload_cors))
        .route("/videos", get(list_videos_handler).layer(list_cors))
        .route("/health", get(health_handler))
        .route_service("/", ServeFile::new(&state.config.index_file))
        .nest_service(
            "/resources/uploaded",
            ServeDir::new(&state.config.upload_dir),
        )
        .nest_service(
            "/resources/thumbnails",
            ServeDir::new(&state.config.thumbnail_dir),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
