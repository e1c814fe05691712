//! File routes: streamed upload, JSON listing and bulk delete.

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlshelf_types::{DatabaseFile, Reply};
use std::sync::Arc;
use tracing::info;

use super::{parse_user, ApiError};
use crate::replies;
use crate::state::AppState;

/// Store the request body as `file_name`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path((user_id, file_name)): Path<(String, String)>,
    body: Body,
) -> Result<(StatusCode, Json<Reply>), ApiError> {
    let user = parse_user(&user_id)?;
    let file = state
        .hub
        .upload(&user, &file_name, body.into_data_stream())
        .await?;

    info!(target: "sqlshelf::api", "User {} uploaded {} ({} bytes)", user, file.name, file.size);
    Ok((StatusCode::CREATED, Json(replies::saved(&file))))
}

/// The user's stored files, without opening them.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<DatabaseFile>>, ApiError> {
    let user = parse_user(&user_id)?;
    Ok(Json(state.hub.files(&user).await?))
}

/// Remove every stored file; same as `/clear`.
pub async fn clear(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Reply>, ApiError> {
    let user = parse_user(&user_id)?;
    state.hub.clear(&user).await?;
    Ok(Json(replies::cleared()))
}
