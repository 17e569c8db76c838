use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use forum_core::ForumError;
use forum_types::api::{Claims, CreatedResponse, SendMessageRequest};

use crate::auth::{AppState, current_user};
use crate::error::ApiError;

/// The current window of recent messages, oldest first.
pub async fn list_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let messages = state.forum.blocking(|forum| forum.list_messages()).await?;
    Ok(Json(messages))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .forum
        .blocking(move |forum| forum.get_message(message_id))
        .await?
        .ok_or(ForumError::NotFound("message"))?;
    Ok(Json(message))
}

/// Post a message. A slot of the sender's allowance is reserved up front
/// and handed back if the message is not stored.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.rate_limiter.reserve(&claims.sub)?;

    let id = match store_message(&state, &claims, req).await {
        Ok(id) => id,
        Err(e) => {
            state.rate_limiter.release(&claims.sub);
            return Err(e);
        }
    };
    debug!("{} posted {}", claims.sub, id);

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn store_message(state: &AppState, claims: &Claims, req: SendMessageRequest) -> Result<Uuid, ApiError> {
    let author = current_user(state, claims).await?;
    let id = state
        .forum
        .blocking(move |forum| forum.create_message(&author, &req.text, req.reply_to))
        .await?;
    Ok(id)
}

pub async fn rate_limit_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.rate_limiter.status(&claims.sub)?))
}
