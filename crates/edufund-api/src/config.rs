//! # Application Configuration
//!
//! All runtime settings come from environment variables (a `.env` file is
//! loaded first by the binary via `dotenvy`). Secrets are held in
//! `Zeroizing` buffers and redacted from `Debug` output.
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | `8080` |
//! | `SESSION_SECRET` | random, per process (warning logged) |
//! | `SESSION_TTL_SECS` | `86400` |
//! | `ADMIN_USERNAME` | `admin` |
//! | `ADMIN_PASSWORD_HASH` | unset: admin login disabled |
//! | `UPLOAD_DIR` | `./uploads` |
//! | `UPLOAD_MAX_BYTES` | `5242880` |
//! | `PUBLIC_UPLOAD_BASE` | `/uploads` |
//! | `CORS_ALLOWED_ORIGINS` | unset: any origin |
//! | `RATE_LIMIT_MAX_REQUESTS` / `RATE_LIMIT_WINDOW_SECS` | `600` / `60` |
//! | `RATE_LIMIT_TRUST_FORWARDED_FOR` | `false` |
//! | `LOG_FORMAT` | `text` (`json` for structured output) |

use std::path::PathBuf;

use rand::RngCore;
use zeroize::Zeroizing;

use crate::middleware::rate_limit::RateLimitConfig;

/// Minimum accepted length of `SESSION_SECRET`, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes")]
    WeakSessionSecret,
    #[error("ADMIN_PASSWORD_HASH is not an argon2 PHC string")]
    InvalidAdminHash,
}

/// The single configured administrator account.
#[derive(Clone)]
pub struct AdminCredential {
    pub username: String,
    /// Argon2id PHC string, as produced by `edufund admin hash-password`.
    pub password_hash: Zeroizing<String>,
}

impl std::fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredential")
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value; unset means text.
    pub fn parse(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(str::trim) {
            None | Some("") | Some("text") => Ok(Self::Text),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(ConfigError::Invalid {
                var: "LOG_FORMAT",
                expected: "log format (text|json)",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// HMAC key for session tokens.
    pub session_secret: Zeroizing<Vec<u8>>,
    pub session_ttl_secs: u64,
    pub admin: Option<AdminCredential>,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    /// URL prefix under which stored uploads are served.
    pub public_upload_base: String,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("session_secret", &"[REDACTED]")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("admin", &self.admin)
            .field("upload_dir", &self.upload_dir)
            .field("upload_max_bytes", &self.upload_max_bytes)
            .field("public_upload_base", &self.public_upload_base)
            .field("cors_origins", &self.cors_origins)
            .field("rate_limit", &self.rate_limit)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            session_secret: random_secret(),
            session_ttl_secs: 24 * 60 * 60,
            admin: None,
            upload_dir: PathBuf::from("./uploads"),
            upload_max_bytes: 5 * 1024 * 1024,
            public_upload_base: "/uploads".to_string(),
            cors_origins: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let session_secret = match get("SESSION_SECRET") {
            Some(s) if s.len() < MIN_SESSION_SECRET_LEN => return Err(ConfigError::WeakSessionSecret),
            Some(s) => Zeroizing::new(s.into_bytes()),
            None => {
                tracing::warn!(
                    "SESSION_SECRET not set; generating an ephemeral key. \
                     Sessions will not survive a restart."
                );
                defaults.session_secret
            }
        };

        let admin = match get("ADMIN_PASSWORD_HASH") {
            Some(hash) => {
                if argon2::PasswordHash::new(&hash).is_err() {
                    return Err(ConfigError::InvalidAdminHash);
                }
                Some(AdminCredential {
                    username: get("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
                    password_hash: Zeroizing::new(hash),
                })
            }
            None => {
                tracing::warn!("ADMIN_PASSWORD_HASH not set; admin login is disabled");
                None
            }
        };

        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let log_format = LogFormat::parse(get("LOG_FORMAT").as_deref())?;

        Ok(Self {
            port: parse_or(&get, "PORT", "port number", defaults.port)?,
            session_secret,
            session_ttl_secs: parse_or(
                &get,
                "SESSION_TTL_SECS",
                "number of seconds",
                defaults.session_ttl_secs,
            )?,
            admin,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            upload_max_bytes: parse_or(
                &get,
                "UPLOAD_MAX_BYTES",
                "byte count",
                defaults.upload_max_bytes,
            )?,
            public_upload_base: get("PUBLIC_UPLOAD_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_upload_base),
            cors_origins,
            rate_limit: RateLimitConfig {
                max_requests: parse_or(
                    &get,
                    "RATE_LIMIT_MAX_REQUESTS",
                    "request count",
                    defaults.rate_limit.max_requests,
                )?,
                window_secs: parse_or(
                    &get,
                    "RATE_LIMIT_WINDOW_SECS",
                    "number of seconds",
                    defaults.rate_limit.window_secs,
                )?,
                trust_forwarded_for: parse_or(
                    &get,
                    "RATE_LIMIT_TRUST_FORWARDED_FOR",
                    "true or false",
                    defaults.rate_limit.trust_forwarded_for,
                )?,
            },
            log_format,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value: raw,
        }),
    }
}

fn random_secret() -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(vec![0u8; 64]);
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}
