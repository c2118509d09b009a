//! How the editor reaches the resume and preference APIs.
//!
//! [`HttpGateway`] talks to a running server with a bearer token.
//! [`LocalGateway`] calls the same services in-process over a repository,
//! which is what tests and local tooling use.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Palette, Resume, UserPreferences};
use crate::preferences::set_palette;
use crate::repository::{PreferenceRepository, ResumeRepository};
use crate::resume::service::save_resume;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Service error: {0}")]
    Service(String),
}

impl GatewayError {
    /// Text suitable for showing next to the editor.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Api { message, .. } => message.clone(),
            GatewayError::Http(_) => "Could not reach the server".to_string(),
            GatewayError::Service(message) => message.clone(),
        }
    }
}

impl From<AppError> for GatewayError {
    fn from(e: AppError) -> Self {
        GatewayError::Service(e.to_string())
    }
}

#[async_trait]
pub trait ResumeGateway: Send + Sync {
    /// The user's resumes, most recently updated first.
    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<Resume>, GatewayError>;

    async fn save_resume(&self, snapshot: &Resume) -> Result<Resume, GatewayError>;
}

/// Preferences of the session user.
#[async_trait]
pub trait PreferenceGateway: Send + Sync {
    async fn fetch_preferences(&self) -> Result<UserPreferences, GatewayError>;

    async fn update_palette(&self, palette: Palette) -> Result<UserPreferences, GatewayError>;

    async fn update_preferences(&self, prefs: UserPreferences) -> Result<UserPreferences, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

#[derive(Serialize)]
struct PalettePatch {
    palette: Palette,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error.code, envelope.error.message),
                Err(_) => ("UNKNOWN".to_string(), body),
            };
            tracing::warn!(status = status.as_u16(), code = %code, "API request failed");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ResumeGateway for HttpGateway {
    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<Resume>, GatewayError> {
        let request = self
            .client
            .get(self.url("/api/resume"))
            .query(&[("user_id", user_id.to_string())]);
        self.send(request).await
    }

    async fn save_resume(&self, snapshot: &Resume) -> Result<Resume, GatewayError> {
        let request = self.client.post(self.url("/api/resume")).json(snapshot);
        self.send(request).await
    }
}

#[async_trait]
impl PreferenceGateway for HttpGateway {
    async fn fetch_preferences(&self) -> Result<UserPreferences, GatewayError> {
        self.send(self.client.get(self.url("/api/user/preferences"))).await
    }

    async fn update_palette(&self, palette: Palette) -> Result<UserPreferences, GatewayError> {
        let request = self
            .client
            .patch(self.url("/api/user/preferences"))
            .json(&PalettePatch { palette });
        self.send(request).await
    }

    async fn update_preferences(&self, prefs: UserPreferences) -> Result<UserPreferences, GatewayError> {
        let request = self
            .client
            .patch(self.url("/api/user/preferences/full"))
            .json(&prefs);
        self.send(request).await
    }
}

/// In-process gateway acting as `user_id`.
#[derive(Clone)]
pub struct LocalGateway {
    user_id: Uuid,
    resumes: Arc<dyn ResumeRepository>,
    preferences: Arc<dyn PreferenceRepository>,
}

impl LocalGateway {
    pub fn new(
        user_id: Uuid,
        resumes: Arc<dyn ResumeRepository>,
        preferences: Arc<dyn PreferenceRepository>,
    ) -> Self {
        Self {
            user_id,
            resumes,
            preferences,
        }
    }
}

#[async_trait]
impl ResumeGateway for LocalGateway {
    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<Resume>, GatewayError> {
        if user_id != self.user_id {
            return Err(AppError::Forbidden.into());
        }
        Ok(self.resumes.list_for_user(user_id).await?)
    }

    async fn save_resume(&self, snapshot: &Resume) -> Result<Resume, GatewayError> {
        let saved = save_resume(self.resumes.as_ref(), self.user_id, snapshot.clone()).await?;
        Ok(saved.resume)
    }
}

#[async_trait]
impl PreferenceGateway for LocalGateway {
    async fn fetch_preferences(&self) -> Result<UserPreferences, GatewayError> {
        Ok(self.preferences.get(self.user_id).await?)
    }

    async fn update_palette(&self, palette: Palette) -> Result<UserPreferences, GatewayError> {
        Ok(set_palette(self.preferences.as_ref(), self.user_id, palette).await?)
    }

    async fn update_preferences(&self, prefs: UserPreferences) -> Result<UserPreferences, GatewayError> {
        Ok(self.preferences.put(self.user_id, prefs).await?)
    }
}
