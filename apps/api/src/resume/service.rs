use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Resume;
use crate::repository::ResumeRepository;
use crate::validation::validate_resume;

/// Outcome of a snapshot save.
#[derive(Debug)]
pub struct SavedResume {
    pub resume: Resume,
    pub created: bool,
}

/// Validates and persists a full resume snapshot on behalf of `owner`.
///
/// A snapshot with a nil `user_id` is adopted by the owner; one naming another
/// user is rejected. Orders are renumbered from list positions before storage.
pub async fn save_resume(
    repo: &dyn ResumeRepository,
    owner: Uuid,
    mut snapshot: Resume,
) -> Result<SavedResume, AppError> {
    if snapshot.user_id.is_nil() {
        snapshot.user_id = owner;
    } else if snapshot.user_id != owner {
        return Err(AppError::Forbidden);
    }

    snapshot.normalize_order();

    let report = validate_resume(&snapshot);
    if !report.passed {
        return Err(AppError::Validation(report.summary()));
    }

    let created = snapshot.id.is_none();
    let resume = repo.save_snapshot(snapshot).await?;

    info!(
        user_id = %owner,
        resume_id = ?resume.id,
        created,
        "Resume saved"
    );

    Ok(SavedResume { resume, created })
}

/// The resume an export or editor session should act on: the requested one,
/// or the user's most recently updated resume.
pub async fn resolve_resume(
    repo: &dyn ResumeRepository,
    user_id: Uuid,
    resume_id: Option<Uuid>,
) -> Result<Resume, AppError> {
    match resume_id {
        Some(id) => repo
            .find(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found"))),
        None => repo
            .list_for_user(user_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("No resume found for this user".to_string())),
    }
}
