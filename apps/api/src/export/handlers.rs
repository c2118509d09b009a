//! Axum route handlers for resume and banner exports.

use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
};
use reqwest::Url;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::export::banner::{render_banner_html, BannerContent};
use crate::export::job::ExportFormat;
use crate::export::orchestrator::{capture_banner, export_document, ExportOptions};
use crate::export::templates::TemplateId;
use crate::models::{BannerColor, Palette};
use crate::resume::service::resolve_resume;
use crate::state::AppState;
use crate::validation::is_http_url;

#[derive(Debug, Deserialize)]
pub struct DocumentExportQuery {
    pub template: Option<String>,
    pub palette: Option<String>,
    pub language: Option<String>,
    #[serde(alias = "resumeId")]
    pub resume_id: Option<Uuid>,
    #[serde(alias = "userId")]
    pub user_id: Option<Uuid>,
    pub disposition: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerExportQuery {
    pub palette: Option<String>,
    pub banner_color: Option<String>,
    pub logo: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Query of the public render page. Values are parsed leniently; the page is
/// only ever loaded with parameters built by [`handle_export_banner`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderBannerQuery {
    pub palette: Option<String>,
    pub banner_color: Option<String>,
    pub logo: Option<String>,
    pub name: Option<String>,
    pub headline: Option<String>,
}

/// Parses an optional query value, falling back to the stored preference.
fn parse_or<T: std::str::FromStr<Err = String>>(raw: Option<&str>, fallback: T) -> Result<T, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value.parse().map_err(AppError::Validation),
        None => Ok(fallback),
    }
}

fn disposition_kind(raw: Option<&str>) -> Result<&'static str, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("attachment") => Ok("attachment"),
        Some("inline") => Ok("inline"),
        Some(other) => Err(AppError::Validation(format!(
            "disposition must be 'inline' or 'attachment', got '{other}'"
        ))),
    }
}

/// Download file name built from the resume owner's name, ASCII only.
pub(crate) fn file_name(owner: &str, suffix: &str, extension: &str) -> String {
    let mut slug = String::new();
    for c in owner.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        format!("{suffix}.{extension}")
    } else {
        format!("{slug}-{suffix}.{extension}")
    }
}

fn binary_response(format: ExportFormat, disposition: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{file_name}\""),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        bytes,
    )
        .into_response()
}

async fn export_resume(
    auth: AuthUser,
    state: AppState,
    params: DocumentExportQuery,
    format: ExportFormat,
) -> Result<Response, AppError> {
    auth.ensure_owner(params.user_id)?;
    let disposition = disposition_kind(params.disposition.as_deref())?;

    let prefs = state.preferences.get(auth.user_id).await?;
    let options = ExportOptions {
        template: TemplateId::lookup(params.template.as_deref()),
        palette: parse_or(params.palette.as_deref(), prefs.palette)?,
        language: parse_or(params.language.as_deref(), prefs.language)?,
    };

    let resume = resolve_resume(state.resumes.as_ref(), auth.user_id, params.resume_id).await?;
    let download = file_name(&resume.header.name, "resume", format.extension());

    tracing::info!(
        user_id = %auth.user_id,
        resume_id = ?resume.id,
        template = options.template.as_str(),
        palette = options.palette.as_str(),
        language = options.language.as_str(),
        format = format.extension(),
        "Exporting resume"
    );

    let bytes = export_document(resume, format, options).await?;
    Ok(binary_response(format, disposition, &download, bytes))
}

/// GET /api/export/resume/pdf
pub async fn handle_export_pdf(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DocumentExportQuery>,
) -> Result<Response, AppError> {
    export_resume(auth, state, params, ExportFormat::Pdf).await
}

/// GET /api/export/resume/docx
pub async fn handle_export_docx(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DocumentExportQuery>,
) -> Result<Response, AppError> {
    export_resume(auth, state, params, ExportFormat::Docx).await
}

/// GET /api/export/banner
///
/// Renders the banner page in a headless browser and returns a PNG.
pub async fn handle_export_banner(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<BannerExportQuery>,
) -> Result<Response, AppError> {
    auth.ensure_owner(params.user_id)?;

    let prefs = state.preferences.get(auth.user_id).await?;
    let palette: Palette = parse_or(params.palette.as_deref(), prefs.palette)?;
    let banner_color: BannerColor = parse_or(params.banner_color.as_deref(), prefs.banner_color)?;

    let logo = params.logo.as_deref().map(str::trim).filter(|l| !l.is_empty());
    if let Some(logo) = logo {
        if !is_http_url(logo) {
            return Err(AppError::Validation("logo must be an http(s) URL".to_string()));
        }
    }

    let (name, headline) = match resolve_resume(state.resumes.as_ref(), auth.user_id, None).await {
        Ok(resume) => (resume.header.name, resume.header.title),
        Err(AppError::NotFound(_)) => (String::new(), String::new()),
        Err(e) => return Err(e),
    };

    let base = format!("{}/render/banner", state.config.public_base_url.trim_end_matches('/'));
    let mut query = vec![
        ("palette", palette.as_str().to_string()),
        ("bannerColor", banner_color.as_str().to_string()),
        ("name", name.clone()),
        ("headline", headline),
    ];
    if let Some(logo) = logo {
        query.push(("logo", logo.to_string()));
    }
    let url = Url::parse_with_params(&base, &query)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid PUBLIC_BASE_URL: {e}")))?;

    tracing::info!(
        user_id = %auth.user_id,
        palette = palette.as_str(),
        banner_color = banner_color.as_str(),
        "Exporting banner"
    );

    let step_timeout = Duration::from_secs(state.config.export_timeout_secs);
    let bytes = capture_banner(state.browser.as_ref(), url.as_str(), step_timeout).await?;

    let download = file_name(&name, "banner", ExportFormat::Png.extension());
    Ok(binary_response(ExportFormat::Png, "attachment", &download, bytes))
}

/// GET /render/banner
///
/// Public page loaded by the headless browser during banner export.
pub async fn handle_render_banner(Query(params): Query<RenderBannerQuery>) -> Html<String> {
    let content = BannerContent {
        palette: params
            .palette
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default(),
        banner_color: params
            .banner_color
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or_default(),
        logo: params.logo,
        name: params.name.unwrap_or_default(),
        headline: params.headline.unwrap_or_default(),
    };
    Html(render_banner_html(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Locale;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("Ada Lovelace", "resume", "pdf"), "ada-lovelace-resume.pdf");
        assert_eq!(file_name("  José  Núñez ", "banner", "png"), "jos-n-ez-banner.png");
        assert_eq!(file_name("***", "resume", "docx"), "resume.docx");
    }

    #[test]
    fn test_parse_or_uses_fallback_for_blank() {
        assert_eq!(parse_or::<Palette>(None, Palette::Forest).unwrap(), Palette::Forest);
        assert_eq!(parse_or::<Palette>(Some(" "), Palette::Forest).unwrap(), Palette::Forest);
        assert_eq!(parse_or::<Locale>(Some("de-AT"), Locale::En).unwrap(), Locale::De);
        assert!(matches!(
            parse_or::<Palette>(Some("neon"), Palette::Ocean),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_disposition_kind() {
        assert_eq!(disposition_kind(None).unwrap(), "attachment");
        assert_eq!(disposition_kind(Some("inline")).unwrap(), "inline");
        assert!(disposition_kind(Some("download")).is_err());
    }
}
