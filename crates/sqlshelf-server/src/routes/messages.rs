//! Chat message route: classify the text and dispatch to the hub.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlshelf_types::{Command, CommandError, MessageRequest, Reply, UserId};
use std::sync::Arc;
use tracing::debug;

use super::{parse_user, ApiError};
use crate::replies;
use crate::state::AppState;

/// Handle one inbound message.
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<Reply>, ApiError> {
    let user = parse_user(&user_id)?;

    let command = Command::parse(&req.text).map_err(|e| match e {
        CommandError::InvalidIndex(_) => ApiError::new(
            StatusCode::BAD_REQUEST,
            Reply::error("invalid_index", "Invalid database index."),
        ),
    })?;
    debug!(target: "sqlshelf::api", "User {} sent {:?}", user, command);

    dispatch(&state, &user, command).await.map(Json)
}

async fn dispatch(state: &AppState, user: &UserId, command: Command) -> Result<Reply, ApiError> {
    let hub = &state.hub;
    let reply = match command {
        Command::Start => replies::welcome(),
        Command::Help => replies::help(),
        Command::List => replies::listing(&hub.list(user).await?),
        Command::Info(args) => replies::schema(
            &hub.info(user, &args).await?,
            args.table.as_deref(),
            args.column.as_deref(),
        ),
        Command::Clear => {
            hub.clear(user).await?;
            replies::cleared()
        }
        Command::Select => replies::selection_prompt(&hub.begin_select(user).await?),
        Command::SelectIndex(text) => replies::selected(&hub.resolve_select(user, &text).await?),
        Command::Query(text) => replies::query_result(&hub.query(user, &text).await?),
        Command::Unknown(_) => return Err(ApiError::new(StatusCode::BAD_REQUEST, replies::unknown())),
    };
    Ok(reply)
}
