//! NPSN client error types.

#[derive(Debug, thiserror::Error)]
pub enum NpsnError {
    /// HTTP transport error (DNS, connect, timeout).
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Registry returned a non-2xx, non-404 status.
    #[error("NPSN registry {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response body was not JSON.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
