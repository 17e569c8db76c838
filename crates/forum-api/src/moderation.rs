//! Moderator-only routes. Each handler first turns the session into a
//! [`Moderator`], so a non-moderator is refused before anything is read.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use forum_core::Moderator;
use forum_types::api::{
    AnnouncementDraft, Claims, CreatedResponse, DeleteMessageResponse, FlaggedQuery, ReportQuery,
    UpdateReportRequest,
};

use crate::auth::AppState;
use crate::error::ApiError;

fn moderator(state: &AppState, claims: &Claims) -> Result<Moderator, ApiError> {
    Ok(state.forum.moderator(&claims.sub)?)
}

pub async fn list_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let moderator = moderator(&state, &claims)?;
    let reports = state
        .forum
        .blocking(move |forum| forum.list_reports(&moderator, query.status))
        .await?;
    Ok(Json(reports))
}

pub async fn update_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let moderator = moderator(&state, &claims)?;
    let report = state
        .forum
        .blocking(move |forum| {
            forum.update_report_status(&moderator, report_id, req.status, req.notes.as_deref())
        })
        .await?;
    Ok(Json(report))
}

pub async fn flagged_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FlaggedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    moderator(&state, &claims)?;
    let messages = state
        .forum
        .blocking(move |forum| forum.flagged_messages(query.min_reports))
        .await?;
    Ok(Json(messages))
}

/// Delete a message after resolving every report filed against it.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let moderator = moderator(&state, &claims)?;
    let outcome = state
        .forum
        .blocking(move |forum| forum.delete_message_and_resolve_reports(&moderator, message_id))
        .await?;

    if !outcome.deleted_message {
        info!("Message {} was already gone", message_id);
    }
    Ok(Json(DeleteMessageResponse {
        deleted_message: outcome.deleted_message,
        updated_reports: outcome.updated_reports,
    }))
}

pub async fn create_announcement(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<AnnouncementDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let moderator = moderator(&state, &claims)?;
    let id = state
        .forum
        .blocking(move |forum| forum.create_announcement(&moderator, &draft))
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
