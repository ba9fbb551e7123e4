use anyhow::{Context, Result};

const DEFAULT_MAX_RESUME_BYTES: usize = 4 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base URL resumes are served from. Defaults to the S3 endpoint.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_resume_bytes: usize,
    pub outbox_poll_secs: u64,
    pub page_view_window_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_endpoint = require_env("S3_ENDPOINT")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_public_url: std::env::var("S3_PUBLIC_URL").unwrap_or_else(|_| s3_endpoint.clone()),
            s3_endpoint,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_resume_bytes: parse_env("MAX_RESUME_BYTES", DEFAULT_MAX_RESUME_BYTES)
                .context("MAX_RESUME_BYTES must be a byte count")?,
            outbox_poll_secs: parse_env("OUTBOX_POLL_SECS", 15)
                .context("OUTBOX_POLL_SECS must be a number of seconds")?,
            page_view_window_days: parse_env("PAGE_VIEW_WINDOW_DAYS", 8)
                .context("PAGE_VIEW_WINDOW_DAYS must be a number of days")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}
