use anyhow::Context;
use std::env;
use std::str::FromStr;

// ============================================================================
// Configuration
// ============================================================================
//
// All configuration comes from the environment. DATABASE_URL is the only
// required value; everything else has a serving default.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub http_host: String,
    pub http_port: u16,
    pub metrics_port: u16,
    pub max_db_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_or("HTTP_PORT", 8080)?,
            metrics_port: parse_or("METRICS_PORT", 9090)?,
            max_db_connections: parse_or("MAX_DB_CONNECTIONS", 10)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be numeric, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
