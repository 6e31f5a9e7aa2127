use axum::{routing::get, Router};

pub mod categories;
pub mod products;
pub mod system;

/// Router for all catalog endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::welcome))
        .route("/health", get(system::health))
        .nest("/products", products::router())
        .nest("/categories", categories::router())
}
