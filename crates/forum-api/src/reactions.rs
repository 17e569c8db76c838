use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use forum_types::api::{Claims, ToggleReactionRequest, ToggleReactionResponse};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let added = state
        .forum
        .blocking(move |forum| forum.toggle_reaction(message_id, &claims.sub, &req.emoji))
        .await?;
    Ok(Json(ToggleReactionResponse { added }))
}

pub async fn get_reactions(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .forum
        .blocking(move |forum| forum.reaction_summary(message_id))
        .await?;
    Ok(Json(summary))
}
