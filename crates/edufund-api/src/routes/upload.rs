//! # Upload API
//!
//! Authenticated multipart upload of images and PDF documents used as
//! proposal covers, report attachments, and timeline photos. Files are
//! stored under the configured upload directory with a random name and
//! served back at the configured public prefix.

use std::path::Path;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Multipart envelope overhead allowed on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL of the stored file.
    pub url: String,
    /// Storage key (file name under the upload directory).
    pub key: String,
    pub content_type: String,
    pub size: usize,
    /// Lowercase hex SHA-256 of the file contents.
    pub sha256: String,
}

/// File extension for an accepted content type.
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

pub fn router(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_bytes.saturating_add(MULTIPART_OVERHEAD)))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// POST /api/upload: multipart form with a single `file` field.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "Form with a `file` field"),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Malformed form or missing file", body = crate::error::ErrorBody),
        (status = 413, description = "File too large", body = crate::error::ErrorBody),
        (status = 422, description = "Unsupported content type", body = crate::error::ErrorBody),
    ),
    tag = "upload"
)]
pub async fn upload(
    State(state): State<AppState>,
    caller: CallerIdentity,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let max_bytes = state.config.upload_max_bytes;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let ext = extension_for(&content_type).ok_or_else(|| {
            AppError::Validation(format!(
                "unsupported content type '{content_type}'; expected image/jpeg, image/png, image/webp, or application/pdf"
            ))
        })?;

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("uploaded file is empty".into()));
        }
        if bytes.len() > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "file is {} bytes; the limit is {max_bytes}",
                bytes.len()
            )));
        }

        let key = format!("{}.{ext}", Uuid::new_v4());
        store(&state.config.upload_dir, &key, &bytes).await?;

        let sha256 = format!("{:x}", Sha256::digest(&bytes));
        tracing::info!(
            key = %key,
            size = bytes.len(),
            content_type = %content_type,
            subject = %caller.subject,
            "file uploaded"
        );

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url: format!("{}/{key}", state.config.public_upload_base),
                key,
                content_type,
                size: bytes.len(),
                sha256,
            }),
        ));
    }

    Err(AppError::BadRequest("multipart field 'file' is required".into()))
}

async fn store(dir: &Path, key: &str, bytes: &[u8]) -> Result<(), AppError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("failed to create upload directory: {e}")))?;
    tokio::fs::write(dir.join(key), bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to write upload {key}: {e}")))
}
