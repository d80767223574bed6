//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers that map
//! JSON rejections to [`AppError::BadRequest`].

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Business-rule validation beyond what serde checks.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run its [`Validate`] rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Reject blank or oversized text fields.
pub(crate) fn require_text(field: &str, value: &str, max_len: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    check_len(field, value, max_len)
}

pub(crate) fn check_len(field: &str, value: &str, max_len: usize) -> Result<(), String> {
    if value.chars().count() > max_len {
        return Err(format!("{field} must not exceed {max_len} characters"));
    }
    Ok(())
}

/// Accept only absolute http(s) URLs or paths served by this API.
pub(crate) fn check_url(field: &str, value: &str) -> Result<(), String> {
    let ok = value.starts_with("https://")
        || value.starts_with("http://")
        || value.starts_with('/');
    if !ok || value.len() > 2048 || value.chars().any(char::is_whitespace) {
        return Err(format!("{field} must be an http(s) URL or absolute path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_rules() {
        assert!(require_text("title", "  ", 10).is_err());
        assert!(require_text("title", "Roof", 10).is_ok());
        let err = require_text("title", "abcdefghijk", 10).unwrap_err();
        assert!(err.contains("10"));
    }

    #[test]
    fn check_len_counts_chars_not_bytes() {
        // Four two-byte characters.
        assert!(check_len("name", "éééé", 4).is_ok());
    }

    #[test]
    fn check_url_rules() {
        assert!(check_url("image", "https://cdn.example.com/a.png").is_ok());
        assert!(check_url("image", "/uploads/abc.png").is_ok());
        assert!(check_url("image", "javascript:alert(1)").is_err());
        assert!(check_url("image", "/uploads/a b.png").is_err());
    }
}
