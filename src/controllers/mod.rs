pub mod tables;
pub mod guests;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use validator::ValidationErrors;

use crate::error::AllocatorError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(tables::routes())
        .merge(guests::routes())
}

/// Полный роутер приложения вместе со служебными маршрутами.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Guest List API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .route("/ping", get(|| async { "Hello World\n" }))
        .merge(routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Ошибка обработчика. На каждый запрос отдаётся ровно один ответ
/// вида `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl From<AllocatorError> for ApiError {
    fn from(e: AllocatorError) -> Self {
        let status = match &e {
            AllocatorError::TableNotFound(_) | AllocatorError::GuestNotFound(_) => StatusCode::NOT_FOUND,
            AllocatorError::CapacityExceeded { .. } | AllocatorError::Validation(_) => StatusCode::BAD_REQUEST,
            AllocatorError::InvalidState { .. } | AllocatorError::GuestExists(_) => StatusCode::CONFLICT,
            AllocatorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("store failure: {:?}", e);
        } else {
            tracing::debug!("request rejected ({}): {}", e.kind(), e);
        }
        ApiError::new(status, e.client_message())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::new(e.status(), e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
