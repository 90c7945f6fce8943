use anyhow::{bail, Context, Result};
use std::str::FromStr;

/// Which persistence backend `main` wires into `AppState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// In-process store, for local runs without Postgres/Redis.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StorageBackend::Postgres),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => bail!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,
    /// Required when `storage_backend` is `Postgres`.
    pub database_url: Option<String>,
    /// Required when `storage_backend` is `Postgres`; backs the public rate limiter.
    pub redis_url: Option<String>,
    /// Absent key means the interviewer always uses its fallback questions.
    pub anthropic_api_key: Option<String>,
    pub jwt_secret: String,
    pub scoring_service_url: Option<String>,
    pub company_name: String,
    pub public_token_ttl_hours: i64,
    pub max_message_chars: usize,
    pub max_screening_questions: u32,
    pub public_rate_limit_per_minute: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let storage_backend: StorageBackend = optional_env("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let (database_url, redis_url) = match storage_backend {
            StorageBackend::Postgres => (
                Some(require_env("DATABASE_URL")?),
                Some(require_env("REDIS_URL")?),
            ),
            StorageBackend::Memory => (optional_env("DATABASE_URL"), optional_env("REDIS_URL")),
        };

        Ok(Config {
            storage_backend,
            database_url,
            redis_url,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            jwt_secret: require_env("JWT_SECRET")?,
            scoring_service_url: optional_env("SCORING_SERVICE_URL"),
            company_name: optional_env("COMPANY_NAME").unwrap_or_else(|| "AuraHR".to_string()),
            public_token_ttl_hours: parse_env("PUBLIC_TOKEN_TTL_HOURS", 72)?,
            max_message_chars: parse_env("MAX_MESSAGE_CHARS", 2000)?,
            max_screening_questions: parse_env("MAX_SCREENING_QUESTIONS", 8)?,
            public_rate_limit_per_minute: parse_env("PUBLIC_RATE_LIMIT_PER_MINUTE", 10)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Defaults used by tests and the memory backend.
    pub fn for_memory(jwt_secret: &str) -> Self {
        Config {
            storage_backend: StorageBackend::Memory,
            database_url: None,
            redis_url: None,
            anthropic_api_key: None,
            jwt_secret: jwt_secret.to_string(),
            scoring_service_url: None,
            company_name: "AuraHR".to_string(),
            public_token_ttl_hours: 72,
            max_message_chars: 2000,
            max_screening_questions: 8,
            public_rate_limit_per_minute: 10,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(
            "Postgres".parse::<StorageBackend>().unwrap(),
            StorageBackend::Postgres
        );
        assert_eq!(
            "memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_memory_defaults() {
        let config = Config::for_memory("secret");
        assert_eq!(config.max_message_chars, 2000);
        assert_eq!(config.public_rate_limit_per_minute, 10);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
    }
}
