//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (repository, classifier, enrichment worker, workflow)
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: query/body decoding helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use catalog_infra::CatalogConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, BackgroundTasks, StartupError};

/// Request bodies above this size are rejected before decoding.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Router plus the background tasks it depends on.
pub struct App {
    pub router: Router,
    pub background: BackgroundTasks,
}

/// Build the full HTTP application from configuration (entrypoint used by `main.rs`).
pub async fn build_app(config: &CatalogConfig) -> Result<App, StartupError> {
    let (services, background) = services::build_services(config).await?;
    Ok(App {
        router: router(Arc::new(services), config.request_timeout),
        background,
    })
}

/// Router over already-built services.
pub fn router(services: Arc<AppServices>, request_timeout: Duration) -> Router {
    routes::router()
        .layer(Extension(services))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}
