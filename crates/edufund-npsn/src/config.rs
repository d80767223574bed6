//! NPSN lookup client configuration.

use url::Url;

/// Public registry endpoint queried when `NPSN_API_URL` is unset.
pub const DEFAULT_NPSN_API_URL: &str = "https://api-sekolah-indonesia.vercel.app/sekolah";

#[derive(Debug, Clone)]
pub struct NpsnConfig {
    /// Lookup endpoint. The NPSN is appended as the `npsn` query parameter.
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl NpsnConfig {
    /// Load configuration from environment variables.
    ///
    /// - `NPSN_API_URL` (default: [`DEFAULT_NPSN_API_URL`])
    /// - `NPSN_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_url("NPSN_API_URL", DEFAULT_NPSN_API_URL)?,
            timeout_secs: std::env::var("NPSN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        })
    }

    /// Point the client at an arbitrary endpoint (mock servers in tests).
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl("base_url".to_string(), e.to_string()))?,
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
