use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use forum_types::api::Claims;

use crate::auth::{AppState, current_user};
use crate::error::ApiError;

/// Banners this user should see right now.
pub async fn active_announcements(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &claims).await?;
    let announcements = state
        .forum
        .blocking(move |forum| forum.active_announcements(&user))
        .await?;
    Ok(Json(announcements))
}

pub async fn dismiss_announcement(
    State(state): State<AppState>,
    Path(announcement_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .forum
        .blocking(move |forum| forum.dismiss_announcement(&claims.sub, announcement_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
