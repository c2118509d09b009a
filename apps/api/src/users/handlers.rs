//! Onboarding and account deletion.

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{NewUser, User};
use crate::state::AppState;
use crate::validation::validate_new_user;

/// POST /api/users/me
///
/// Creates the account record for the session's subject.
pub async fn handle_onboard(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    input.username = input.username.trim().to_string();
    input.email = input.email.trim().to_string();

    let report = validate_new_user(&input.username, &input.email);
    if !report.passed {
        return Err(AppError::Validation(report.summary()));
    }

    let user = state.users.create(auth.user_id, &input).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "User onboarded");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/me
pub async fn handle_get_me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    state
        .users
        .find(auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.user_id)))
}

/// DELETE /api/users/me
///
/// Deletes the account together with its resumes and preferences.
pub async fn handle_delete_me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.users.delete(auth.user_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", auth.user_id)));
    }
    tracing::info!(user_id = %auth.user_id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}
