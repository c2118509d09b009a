use std::sync::Arc;

use crate::config::Config;
use crate::export::browser::BrowserLauncher;
use crate::repository::{PreferenceRepository, ResumeRepository, UserRepository};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub resumes: Arc<dyn ResumeRepository>,
    pub preferences: Arc<dyn PreferenceRepository>,
    pub users: Arc<dyn UserRepository>,
    /// Starts one isolated browser per banner export. Default: `ChromiumLauncher`.
    pub browser: Arc<dyn BrowserLauncher>,
    pub config: Config,
}

#[cfg(test)]
pub(crate) mod testing {
    //! State over in-memory repositories and a fake browser.

    use super::*;
    use crate::export::browser::fake::FakeLauncher;
    use crate::repository::MemoryRepository;

    pub const TEST_SECRET: &str = "test-secret";

    pub fn test_config() -> Config {
        Config {
            database_url: "postgres://unused".to_string(),
            jwt_secret: TEST_SECRET.to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            chrome_bin: "chromium".to_string(),
            export_timeout_secs: 5,
        }
    }

    pub fn memory_state(repo: Arc<MemoryRepository>, browser: Arc<FakeLauncher>) -> AppState {
        AppState {
            resumes: repo.clone(),
            preferences: repo.clone(),
            users: repo,
            browser,
            config: test_config(),
        }
    }
}
