use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failures surfaced to API callers as a status code plus a JSON error body.
/// Token values never appear in messages or logs.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    ZoneNotFound,
    RecordNotFound,
    InvalidTtl(u32),
    TypeConflict,
    EditForbidden,
    Provider(anyhow::Error),
    Store(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::ZoneNotFound => (StatusCode::NOT_FOUND, "Domain zone not found".to_string()),
            ApiError::RecordNotFound => {
                (StatusCode::NOT_FOUND, "DNS record not found".to_string())
            }
            ApiError::InvalidTtl(ttl) => (
                StatusCode::BAD_REQUEST,
                format!("TTL must be between 60 and 86400, got {ttl}"),
            ),
            ApiError::TypeConflict => (
                StatusCode::CONFLICT,
                "Service name already registered under a different type".to_string(),
            ),
            ApiError::EditForbidden => (
                StatusCode::FORBIDDEN,
                "Zone credentials do not permit record edits".to_string(),
            ),
            ApiError::Provider(e) => {
                tracing::error!("DNS provider error: {e:#}");
                (StatusCode::BAD_GATEWAY, "DNS provider error".to_string())
            }
            ApiError::Store(e) => {
                tracing::error!("Store error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to persist registry state".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
