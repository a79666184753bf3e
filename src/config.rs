// config.rs
use anyhow::Context;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub min_proposal_length: usize,
    pub notification_retry_secs: u64,
    pub notification_max_attempts: u32,
    pub log_level: String,
    pub allowed_origins: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[redacted]")
            .field("jwt_secret", &"[redacted]")
            .field("port", &self.port)
            .field("min_proposal_length", &self.min_proposal_length)
            .field("notification_retry_secs", &self.notification_retry_secs)
            .field("notification_max_attempts", &self.notification_max_attempts)
            .field("log_level", &self.log_level)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl Config {
    pub fn init() -> anyhow::Result<Config> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;

        let log_level = std::env::var("RUST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:8000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            database_url,
            jwt_secret,
            port: parse_or("PORT", 8000)?,
            min_proposal_length: parse_or("MIN_PROPOSAL_LENGTH", 20)?,
            notification_retry_secs: parse_or("NOTIFICATION_RETRY_SECS", 30)?,
            notification_max_attempts: parse_or("NOTIFICATION_MAX_ATTEMPTS", 5)?,
            log_level,
            allowed_origins,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
