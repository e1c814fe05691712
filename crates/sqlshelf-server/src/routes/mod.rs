//! HTTP route handlers.

pub mod files;
pub mod messages;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use sqlshelf_core::CoreError;
use sqlshelf_types::{Reply, UserId};
use std::sync::Arc;
use tracing::{debug, error};

use crate::replies;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Routes mounted under `/api`.
pub fn api() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/users/{user_id}/messages", post(messages::receive))
        .route(
            "/users/{user_id}/files",
            get(files::list).delete(files::clear),
        )
        .route("/users/{user_id}/files/{file_name}", put(files::upload))
}

/// A failed request, always rendered as a JSON [`Reply`].
pub struct ApiError {
    status: StatusCode,
    reply: Reply,
}

impl ApiError {
    pub fn new(status: StatusCode, reply: Reply) -> Self {
        Self { status, reply }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        if err.is_user_error() {
            debug!(target: "sqlshelf::api", "Request failed: {}", err);
        } else {
            error!(target: "sqlshelf::api", "Request failed: {}", err);
        }
        Self {
            status: status_for(&err),
            reply: replies::error(&err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.reply)).into_response()
    }
}

pub fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Duplicate(_) => StatusCode::CONFLICT,
        CoreError::InvalidFileName { .. } | CoreError::InvalidIndex { .. } | CoreError::Rejected(_) => {
            StatusCode::BAD_REQUEST
        }
        CoreError::NotSelected | CoreError::Empty => StatusCode::NOT_FOUND,
        CoreError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        CoreError::Open { .. } | CoreError::Query(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Parse the `{user_id}` path segment.
pub(crate) fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    UserId::parse(raw).map_err(|e| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            Reply::error("invalid_user", format!("Invalid user id: {}", e)),
        )
    })
}
