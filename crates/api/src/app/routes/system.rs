use axum::http::StatusCode;

pub async fn welcome() -> &'static str {
    "Welcome to the product catalog service"
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
