//! Runtime configuration.
//!
//! Read once at startup from the process environment (after `.env` is
//! loaded). Only the API credential is mandatory.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_MAX_UPLOAD_MB: usize = 25;

/// Settings for the remote extraction backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub bind: SocketAddr,
    /// Maximum multipart request size in bytes.
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .or_else(|| get("API_KEY"))
            .context("GEMINI_API_KEY (or API_KEY) environment variable not set")?;

        let mut gemini = GeminiConfig::new(api_key);
        if let Some(model) = get("GEMINI_MODEL") {
            gemini.model = model;
        }
        if let Some(base_url) = get("GEMINI_BASE_URL") {
            gemini.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("EXTRACT_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid EXTRACT_TIMEOUT_SECS: {}", secs))?;
            gemini.timeout = Duration::from_secs(secs);
        }

        let bind_raw = get("FIN_EXTRACT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid FIN_EXTRACT_BIND: {}", bind_raw))?;

        let max_upload_mb = match get("FIN_EXTRACT_MAX_UPLOAD_MB") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid FIN_EXTRACT_MAX_UPLOAD_MB: {}", raw))?,
            None => DEFAULT_MAX_UPLOAD_MB,
        };

        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .with_context(|| format!("FIN_EXTRACT_MAX_UPLOAD_MB too large: {}", max_upload_mb))?;

        Ok(Self {
            gemini,
            bind,
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.gemini.api_key, "k");
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
        assert_eq!(config.gemini.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.gemini.timeout, Duration::from_secs(60));
        assert_eq!(config.bind.to_string(), "127.0.0.1:3000");
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn test_api_key_fallback() {
        let config = AppConfig::from_lookup(lookup(&[("API_KEY", "legacy")])).unwrap();
        assert_eq!(config.gemini.api_key, "legacy");
    }

    #[test]
    fn test_missing_api_key() {
        let err = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_MODEL", "gemini-2.0-pro"),
            ("GEMINI_BASE_URL", "http://localhost:9999/"),
            ("EXTRACT_TIMEOUT_SECS", "5"),
            ("FIN_EXTRACT_BIND", "0.0.0.0:8080"),
            ("FIN_EXTRACT_MAX_UPLOAD_MB", "2"),
        ]))
        .unwrap();
        assert_eq!(config.gemini.model, "gemini-2.0-pro");
        assert_eq!(config.gemini.base_url, "http://localhost:9999");
        assert_eq!(config.gemini.timeout, Duration::from_secs(5));
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_bind() {
        let result = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("FIN_EXTRACT_BIND", "not-an-address"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_upload_limit_overflow_is_error() {
        let huge = usize::MAX.to_string();
        let err = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("FIN_EXTRACT_MAX_UPLOAD_MB", huge.as_str()),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("FIN_EXTRACT_MAX_UPLOAD_MB"));
    }
}
