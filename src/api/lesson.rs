use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::ToSchema;

use super::{AppState, JsonBody, require_self};
use crate::{
    curriculum::access::LessonStatus,
    error::{Message, Result},
    progress::ProgressUpdate,
    user,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    /// Percentage in 0..=100; 100 marks the course as SELESAI
    pub progress: i64,
    /// Replaces the stored sequence when present
    pub completed_lessons: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLessonRequest {
    pub lesson_path: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonAccess {
    pub is_accessible: bool,
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/progress",
    params(("id" = String, Path, description = "User uuid")),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Progress and status updated", body = Message),
        (status = 400, description = "Progress out of range", body = Message),
        (status = 404, description = "User not found", body = Message)
    )
)]
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ProgressRequest>,
) -> Result<Json<Message>> {
    user::ensure_user(&state.database, &id).await?;
    let update = ProgressUpdate::new(req.progress, req.completed_lessons)?;
    user::update_progress(&state.database, &id, update).await?;
    Ok(Json(Message::new("progress and status updated")))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/validate-lesson",
    params(("id" = String, Path, description = "User uuid, must be the logged-in user")),
    request_body = ValidateLessonRequest,
    responses(
        (status = 200, description = "Whether the lesson may be opened", body = LessonAccess),
        (status = 400, description = "Unknown lesson path", body = Message),
        (status = 403, description = "Session does not belong to this user", body = Message),
        (status = 404, description = "User not found", body = Message)
    )
)]
pub async fn validate_lesson(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ValidateLessonRequest>,
) -> Result<Json<LessonAccess>> {
    require_self(&session, &id).await?;
    let completed_lessons = user::get_completed_lessons(&state.database, &id).await?;
    let is_accessible = state
        .catalog
        .is_accessible(&req.lesson_path, &completed_lessons)?;
    Ok(Json(LessonAccess { is_accessible }))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/lessons",
    params(("id" = String, Path, description = "User uuid, must be the logged-in user")),
    responses(
        (status = 200, description = "Every lesson in teaching order with its state", body = Vec<LessonStatus>),
        (status = 403, description = "Session does not belong to this user", body = Message),
        (status = 404, description = "User not found", body = Message)
    )
)]
pub async fn lesson_states(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Vec<LessonStatus>>> {
    require_self(&session, &id).await?;
    let completed_lessons = user::get_completed_lessons(&state.database, &id).await?;
    Ok(Json(state.catalog.lesson_states(&completed_lessons)))
}

pub fn get_lesson_scope() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/{id}/progress", patch(update_progress))
        .route("/users/{id}/validate-lesson", post(validate_lesson))
        .route("/users/{id}/lessons", get(lesson_states))
}
