//! Runs one export end to end and tracks it with an [`ExportJob`].
//!
//! Callers either get the complete output bytes or an error; partial output
//! is never returned.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::errors::AppError;
use crate::export::banner::{BANNER_HEIGHT, BANNER_WIDTH, READY_SELECTOR};
use crate::export::browser::{BrowserError, BrowserLauncher, BrowserSession, Clip, Viewport};
use crate::export::document::build_document;
use crate::export::docx::write_docx;
use crate::export::job::{ExportFormat, ExportJob, JobError};
use crate::export::layout::layout_document;
use crate::export::pdf::write_pdf;
use crate::export::templates::TemplateId;
use crate::models::{Locale, Palette, Resume};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub template: TemplateId,
    pub palette: Palette,
    pub language: Locale,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Export produced no output")]
    EmptyOutput,

    #[error(transparent)]
    Job(#[from] JobError),
}

impl From<ExportError> for AppError {
    fn from(e: ExportError) -> Self {
        AppError::Export(e.to_string())
    }
}

/// Renders a resume document synchronously. CPU bound.
pub fn render_document(
    resume: &Resume,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let template = options.template.template();
    let colors = options.palette.colors();
    let doc = build_document(resume, &template, options.language);

    match format {
        ExportFormat::Pdf => {
            let pages = layout_document(&doc, &template, colors);
            Ok(write_pdf(&pages, template.font, &doc.title))
        }
        ExportFormat::Docx => {
            write_docx(&doc, &template, colors).map_err(|e| ExportError::Render(e.to_string()))
        }
        ExportFormat::Png => Err(ExportError::Render(
            "images are produced by banner capture".to_string(),
        )),
    }
}

fn settle(job: &mut ExportJob, result: Result<Vec<u8>, ExportError>) -> Result<Vec<u8>, ExportError> {
    match result {
        Ok(bytes) if bytes.is_empty() => {
            job.fail("empty output")?;
            Err(ExportError::EmptyOutput)
        }
        Ok(bytes) => {
            job.finish(bytes.len())?;
            Ok(bytes)
        }
        Err(e) => {
            job.fail(e.to_string())?;
            Err(e)
        }
    }
}

/// Renders a PDF or DOCX off the async runtime.
pub async fn export_document(
    resume: Resume,
    format: ExportFormat,
    options: ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let mut job = ExportJob::new(format);
    job.start()?;

    let rendered = tokio::task::spawn_blocking(move || render_document(&resume, format, &options))
        .await
        .map_err(|e| ExportError::Render(format!("render task failed: {e}")))
        .and_then(|result| result);

    settle(&mut job, rendered)
}

async fn drive(session: &mut dyn BrowserSession, url: &str, step_timeout: Duration) -> Result<Vec<u8>, BrowserError> {
    session.navigate(url, step_timeout).await?;
    session.wait_for_selector(READY_SELECTOR, step_timeout).await?;
    session
        .screenshot(Clip {
            x: 0.0,
            y: 0.0,
            width: f64::from(BANNER_WIDTH),
            height: f64::from(BANNER_HEIGHT),
        })
        .await
}

/// Screenshots the banner page at `url` in a fresh browser.
///
/// The browser is closed on every path once it has launched, whether or not
/// the capture succeeded. `step_timeout` bounds navigation and the wait for
/// the page's ready signal separately.
pub async fn capture_banner(
    launcher: &dyn BrowserLauncher,
    url: &str,
    step_timeout: Duration,
) -> Result<Vec<u8>, ExportError> {
    let mut job = ExportJob::new(ExportFormat::Png);
    job.start()?;

    let viewport = Viewport {
        width: BANNER_WIDTH,
        height: BANNER_HEIGHT,
    };
    let mut session = match launcher.launch(viewport).await {
        Ok(session) => session,
        Err(e) => return settle(&mut job, Err(e.into())),
    };

    let captured = drive(session.as_mut(), url, step_timeout).await;

    if let Err(e) = session.close().await {
        warn!(job_id = %job.id, "Browser cleanup failed: {e}");
    }

    settle(&mut job, captured.map_err(ExportError::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::browser::fake::{FakeLauncher, Outcome, PNG_STUB};
    use crate::models::resume::fixtures::sample_resume;
    use uuid::Uuid;

    const URL: &str = "http://127.0.0.1:8080/render/banner?palette=ocean";

    #[tokio::test]
    async fn test_capture_returns_image_and_closes_browser() {
        let launcher = FakeLauncher::new(Outcome::Capture);
        let bytes = capture_banner(&launcher, URL, Duration::from_secs(1)).await.unwrap();
        assert_eq!(bytes, PNG_STUB);
        assert_eq!(launcher.counters.launches(), 1);
        assert_eq!(launcher.counters.closes(), 1);
        assert_eq!(launcher.counters.urls(), vec![URL.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_ready_signal_still_closes_browser() {
        let launcher = FakeLauncher::new(Outcome::NeverReady);
        let err = capture_banner(&launcher, URL, Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, ExportError::Browser(BrowserError::MissingSelector { .. })));
        assert_eq!(launcher.counters.closes(), 1);
    }

    #[tokio::test]
    async fn test_navigation_timeout_still_closes_browser() {
        let launcher = FakeLauncher::new(Outcome::NavigationTimesOut);
        let err = capture_banner(&launcher, URL, Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, ExportError::Browser(BrowserError::Timeout(..))));
        assert_eq!(launcher.counters.launches(), 1);
        assert_eq!(launcher.counters.closes(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_is_an_export_error() {
        let launcher = FakeLauncher::new(Outcome::LaunchFails);
        let err = capture_banner(&launcher, URL, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ExportError::Browser(BrowserError::Launch(_))));
        assert_eq!(launcher.counters.closes(), 0);
        assert!(matches!(AppError::from(err), AppError::Export(_)));
    }

    #[tokio::test]
    async fn test_pdf_export_contains_resume_text() {
        let bytes = export_document(
            sample_resume(Uuid::new_v4()),
            ExportFormat::Pdf,
            ExportOptions::default(),
        )
        .await
        .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        let text = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(text.contains("Ada Lovelace"));
        assert!(text.contains("Babbage & Co"));
    }

    #[tokio::test]
    async fn test_docx_export_is_a_zip() {
        let bytes = export_document(
            sample_resume(Uuid::new_v4()),
            ExportFormat::Docx,
            ExportOptions {
                template: TemplateId::Classic,
                palette: Palette::Graphite,
                language: Locale::Es,
            },
        )
        .await
        .unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_png_is_not_a_document_format() {
        let resume = sample_resume(Uuid::new_v4());
        assert!(render_document(&resume, ExportFormat::Png, &ExportOptions::default()).is_err());
    }
}
