use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    /// Base URL the headless browser uses to reach this server's render pages.
    pub public_base_url: String,
    pub chrome_bin: String,
    /// Upper bound for each browser step (launch, navigation, DOM-ready wait).
    pub export_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{port}")),
            chrome_bin: std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string()),
            export_timeout_secs: std::env::var("EXPORT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<u64>()
                .context("EXPORT_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
