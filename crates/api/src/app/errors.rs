use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use catalog_core::CatalogError;

/// Client-facing text for upstream failures; the detail only goes to the log.
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::Validation(e) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", e.to_string()),
        CatalogError::Payload(msg) => {
            tracing::debug!(error = %msg, "rejected request payload");
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_payload", "Invalid request payload")
        }
        e @ CatalogError::TooManyIds { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "too_many_ids", e.to_string())
        }
        e @ CatalogError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        CatalogError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        CatalogError::Upstream(msg) => {
            tracing::error!(error = %msg, "request failed on a downstream call");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_ERROR_MESSAGE)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
