use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use forum_types::api::{Claims, CreatedResponse, ReportRequest};

use crate::auth::{AppState, current_user};
use crate::error::ApiError;

pub async fn create_report(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reporter = current_user(&state, &claims).await?;
    let id = state
        .forum
        .blocking(move |forum| forum.create_report(message_id, &reporter, &req.reason))
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
