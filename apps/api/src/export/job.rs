//! Lifecycle of a single export request.
//!
//! `Idle -> Rendering -> Done | Failed`. Terminal states are final; any other
//! transition is rejected so a job can never report success twice or succeed
//! after failing.

use std::fmt;
use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Docx,
    Png,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Rendering,
    Done { bytes: usize },
    Failed { reason: String },
}

impl ExportState {
    fn name(&self) -> &'static str {
        match self {
            ExportState::Idle => "idle",
            ExportState::Rendering => "rendering",
            ExportState::Done { .. } => "done",
            ExportState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal export transition: {from} -> {to}")]
pub struct JobError {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug)]
pub struct ExportJob {
    pub id: Uuid,
    pub format: ExportFormat,
    state: ExportState,
    started_at: Option<Instant>,
}

impl ExportJob {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            id: Uuid::new_v4(),
            format,
            state: ExportState::Idle,
            started_at: None,
        }
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    fn illegal(&self, to: &'static str) -> JobError {
        JobError {
            from: self.state.name(),
            to,
        }
    }

    pub fn start(&mut self) -> Result<(), JobError> {
        if self.state != ExportState::Idle {
            return Err(self.illegal("rendering"));
        }
        self.state = ExportState::Rendering;
        self.started_at = Some(Instant::now());
        tracing::debug!(job_id = %self.id, format = self.format.extension(), "Export started");
        Ok(())
    }

    pub fn finish(&mut self, bytes: usize) -> Result<(), JobError> {
        if self.state != ExportState::Rendering {
            return Err(self.illegal("done"));
        }
        self.state = ExportState::Done { bytes };
        tracing::info!(
            job_id = %self.id,
            format = self.format.extension(),
            bytes,
            elapsed_ms = self.elapsed_ms(),
            "Export finished"
        );
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), JobError> {
        if self.state != ExportState::Rendering {
            return Err(self.illegal("failed"));
        }
        let reason = reason.into();
        tracing::warn!(
            job_id = %self.id,
            format = self.format.extension(),
            elapsed_ms = self.elapsed_ms(),
            reason = %reason,
            "Export failed"
        );
        self.state = ExportState::Failed { reason };
        Ok(())
    }

    fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or_default()
    }
}
