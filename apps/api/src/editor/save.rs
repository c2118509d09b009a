//! Turns an edited draft into a persisted resume.

use thiserror::Error;
use tracing::{info, warn};

use crate::editor::gateway::{GatewayError, ResumeGateway};
use crate::models::Resume;
use crate::validation::validate_resume;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveError {
    /// The draft failed validation before anything was sent.
    #[error("{0}")]
    Invalid(String),

    /// The server (or the connection to it) rejected the save.
    #[error("{0}")]
    Rejected(String),
}

impl SaveError {
    pub fn message(&self) -> &str {
        match self {
            SaveError::Invalid(m) | SaveError::Rejected(m) => m,
        }
    }
}

impl From<GatewayError> for SaveError {
    fn from(e: GatewayError) -> Self {
        SaveError::Rejected(e.user_message())
    }
}

/// Normalizes, validates and submits full resume snapshots. One attempt per
/// call; retrying is left to the user.
pub struct SaveOrchestrator<'a> {
    gateway: &'a dyn ResumeGateway,
}

impl<'a> SaveOrchestrator<'a> {
    pub fn new(gateway: &'a dyn ResumeGateway) -> Self {
        Self { gateway }
    }

    /// Returns the persisted record, with server-assigned ids on every item.
    pub async fn save(&self, draft: &Resume) -> Result<Resume, SaveError> {
        let mut snapshot = draft.clone();
        snapshot.normalize_order();

        let report = validate_resume(&snapshot);
        if !report.passed {
            warn!(errors = report.errors.len(), "Draft failed validation");
            return Err(SaveError::Invalid(report.summary()));
        }

        let saved = self.gateway.save_resume(&snapshot).await?;
        info!(resume_id = ?saved.id, "Draft saved");
        Ok(saved)
    }
}
