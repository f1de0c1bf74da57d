use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Tunables for one resolver process, read from `KRESOURCE_*` variables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolverConfig {
    /// Top-level sources visited at once (0 or 1 = sequential).
    #[validate(range(max = 64))]
    pub visitor_concurrency: usize,

    /// GET attempts per manifest URL.
    #[validate(range(min = 1, max = 10))]
    pub http_attempts: i32,

    pub http_retry_delay_ms: u64,

    /// Page size for selector listing; 0 lists everything in one call.
    pub chunk_size: u32,

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[validate(length(min = 1))]
    pub log_filter: String,

    pub log_dir: Option<String>,

    #[validate(url)]
    pub k8s_api_url: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            visitor_concurrency: 0,
            http_attempts: 3,
            http_retry_delay_ms: 1000,
            chunk_size: 500,
            log_filter: "info".to_string(),
            log_dir: None,
            k8s_api_url: None,
        }
    }
}

impl ResolverConfig {
    /// Loads `.env` (if any) and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            visitor_concurrency: parse_or(&lookup, "KRESOURCE_VISITOR_CONCURRENCY", defaults.visitor_concurrency)?,
            http_attempts: parse_or(&lookup, "KRESOURCE_HTTP_ATTEMPTS", defaults.http_attempts)?,
            http_retry_delay_ms: parse_or(&lookup, "KRESOURCE_HTTP_RETRY_DELAY_MS", defaults.http_retry_delay_ms)?,
            chunk_size: parse_or(&lookup, "KRESOURCE_CHUNK_SIZE", defaults.chunk_size)?,
            log_filter: non_empty(&lookup, "KRESOURCE_LOG").unwrap_or(defaults.log_filter),
            log_dir: non_empty(&lookup, "KRESOURCE_LOG_DIR"),
            k8s_api_url: non_empty(&lookup, "KRESOURCE_K8S_API_URL"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn http_retry_delay(&self) -> Duration {
        Duration::from_millis(self.http_retry_delay_ms)
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("Invalid value '{}' for {}: {}", raw, key, e)),
        None => Ok(default),
    }
}
