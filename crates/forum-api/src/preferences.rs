use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use forum_types::api::{Claims, DisplayPreferencesRequest, LastReadRequest};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let prefs = state
        .forum
        .blocking(move |forum| forum.preferences(&claims.sub))
        .await?;
    Ok(Json(prefs))
}

/// Merge the given display settings into the stored ones.
pub async fn update_display(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DisplayPreferencesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let prefs = state
        .forum
        .blocking(move |forum| {
            forum.set_display_preferences(&claims.sub, req.dark_mode, req.notifications)
        })
        .await?;
    Ok(Json(prefs))
}

/// Always succeeds; a failed write is logged by the service.
pub async fn update_last_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LastReadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .forum
        .blocking(move |forum| {
            forum.update_last_read(&claims.sub, req.message_id);
            Ok(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
