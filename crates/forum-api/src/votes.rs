use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use forum_types::api::{Claims, VoteRequest, VoteResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// Cast, switch or withdraw a vote. Repeating the current choice withdraws it.
pub async fn vote(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let vote = state
        .forum
        .blocking(move |forum| forum.vote(message_id, &claims.sub, req.choice))
        .await?;
    Ok(Json(VoteResponse { vote }))
}

pub async fn get_vote(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let vote = state
        .forum
        .blocking(move |forum| Ok(forum.get_vote(message_id, &claims.sub)))
        .await?;
    Ok(Json(VoteResponse { vote }))
}
