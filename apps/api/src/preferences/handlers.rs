//! Axum route handlers for user preferences.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{Palette, UserPreferences};
use crate::preferences::set_palette;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PalettePatch {
    pub palette: Palette,
}

/// GET /api/user/preferences
pub async fn handle_get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserPreferences>, AppError> {
    Ok(Json(state.preferences.get(auth.user_id).await?))
}

/// PATCH /api/user/preferences
pub async fn handle_patch_palette(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(patch): Json<PalettePatch>,
) -> Result<Json<UserPreferences>, AppError> {
    let prefs = set_palette(state.preferences.as_ref(), auth.user_id, patch.palette).await?;
    Ok(Json(prefs))
}

/// PATCH /api/user/preferences/full
pub async fn handle_put_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(prefs): Json<UserPreferences>,
) -> Result<Json<UserPreferences>, AppError> {
    let stored = state.preferences.put(auth.user_id, prefs).await?;
    tracing::info!(
        user_id = %auth.user_id,
        palette = stored.palette.as_str(),
        banner_color = stored.banner_color.as_str(),
        language = stored.language.as_str(),
        "Preferences replaced"
    );
    Ok(Json(stored))
}
