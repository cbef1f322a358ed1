use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Client configuration loaded from environment variables.
/// Every variable is optional; bad numeric values fail at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub page_size: u32,
    pub request_timeout: Duration,
    pub session_file: Option<PathBuf>,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_file: None,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let page_size = optional_env("PAGE_SIZE")
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("PAGE_SIZE must be a positive integer")?
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            anyhow::bail!("PAGE_SIZE must be greater than zero");
        }

        let timeout_secs = optional_env("REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Config {
            api_url: optional_env("PROMPT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            page_size,
            request_timeout: Duration::from_secs(timeout_secs),
            session_file: optional_env("SESSION_FILE").map(PathBuf::from),
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backend_contract() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8080/api/v1");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.session_file.is_none());
    }
}
