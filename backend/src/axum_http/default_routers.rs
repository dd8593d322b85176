use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::error_responses::json_error;

pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not found")
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
