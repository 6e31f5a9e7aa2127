use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use catalog_core::ProductId;
use catalog_products::{InventoryDelta, ProductDraft};

use crate::app::dto::{self, ImageQuery};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/featured", get(featured_products))
        .route("/category/:category", get(products_in_category))
        .route("/:id", get(get_products).put(update_product).delete(delete_product))
        .route("/:id/inventory", patch(adjust_inventory).post(adjust_inventory))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ImageQuery>,
) -> axum::response::Response {
    match services.workflow.list_products(query.mode()).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn featured_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ImageQuery>,
) -> axum::response::Response {
    match services.workflow.featured_products(query.mode()).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn products_in_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
    Query(query): Query<ImageQuery>,
) -> axum::response::Response {
    match services.workflow.products_in_category(&category, query.mode()).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

/// `GET /products/{ids}`: one id returns an object, several return an array.
pub async fn get_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(ids): Path<String>,
    Query(query): Query<ImageQuery>,
) -> axum::response::Response {
    let ids = dto::parse_id_list(&ids);
    match services.workflow.show_products(&ids, query.mode()).await {
        Ok(selection) => Json(selection).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ImageQuery>,
    body: Bytes,
) -> axum::response::Response {
    let draft: ProductDraft = match dto::decode_json(&body) {
        Ok(v) => v,
        Err(e) => return errors::catalog_error_to_response(e),
    };

    match services.workflow.create(draft, query.mode()).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<ImageQuery>,
    body: Bytes,
) -> axum::response::Response {
    let draft: ProductDraft = match dto::decode_json(&body) {
        Ok(v) => v,
        Err(e) => return errors::catalog_error_to_response(e),
    };

    match services.workflow.update(&ProductId::from(id), draft, query.mode()).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn adjust_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<ImageQuery>,
    body: Bytes,
) -> axum::response::Response {
    let delta: InventoryDelta = match dto::decode_json(&body) {
        Ok(v) => v,
        Err(e) => return errors::catalog_error_to_response(e),
    };

    match services
        .workflow
        .adjust_inventory(&ProductId::from(id), delta.stock_delta, query.mode())
        .await
    {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match services.workflow.delete(&ProductId::from(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
