//! Axum route handlers for the Resume API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::Resume;
use crate::resume::service::save_resume;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    #[serde(alias = "userId")]
    pub user_id: Option<Uuid>,
}

/// GET /api/resume
///
/// All resumes of the session user, most recently updated first, each with
/// its sections in display order.
pub async fn handle_list_resumes(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<Vec<Resume>>, AppError> {
    auth.ensure_owner(params.user_id)?;
    let resumes = state.resumes.list_for_user(auth.user_id).await?;
    Ok(Json(resumes))
}

/// POST /api/resume
///
/// Persists a full snapshot. Returns 201 when the snapshot created a resume.
pub async fn handle_save_resume(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(snapshot): Json<Resume>,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let saved = save_resume(state.resumes.as_ref(), auth.user_id, snapshot).await?;
    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved.resume)))
}

/// GET /api/resume/:id
pub async fn handle_get_resume(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<Resume>, AppError> {
    let resume = state
        .resumes
        .find(auth.user_id, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    Ok(Json(resume))
}

/// DELETE /api/resume/:id
pub async fn handle_delete_resume(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.resumes.delete(auth.user_id, resume_id).await? {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    tracing::info!(user_id = %auth.user_id, resume_id = %resume_id, "Resume deleted");
    Ok(StatusCode::NO_CONTENT)
}
