use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use catalog_core::CategoryId;

use crate::app::dto::ImageQuery;
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories))
        .route("/:id", get(get_category))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ImageQuery>,
) -> axum::response::Response {
    match services.workflow.list_categories(query.mode()).await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<ImageQuery>,
) -> axum::response::Response {
    match services.workflow.show_category(&CategoryId::from(id), query.mode()).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
