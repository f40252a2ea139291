use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::client::CrawlApi;
use crate::lifecycle::Session;

pub mod handlers;
pub mod models;

/// JSON API only. Used directly by tests and wrapped by [`create_app`].
pub fn create_router<C: CrawlApi>(session: Arc<Session<C>>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/crawl",
            post(handlers::submit_crawl::<C>).get(handlers::crawl_status::<C>),
        )
        .route("/api/crawl/export", get(handlers::export_csv::<C>))
        .with_state(session)
        .layer(cors)
}

/// API plus the form page served from `static_dir`.
pub fn create_app<C: CrawlApi>(session: Arc<Session<C>>, static_dir: &Path) -> Router {
    create_router(session)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
}
