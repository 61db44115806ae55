//! Multipart upload handling shared by every file endpoint.
//!
//! The `file` field is spooled chunk-by-chunk into a `NamedTempFile` in the
//! configured upload directory. The byte count is checked as it grows, so an
//! oversized upload is rejected before it is fully received and before any
//! extractor runs. The temp file is removed when `UploadedFile` is dropped.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::extract::{extract_file, DocumentFormat};

/// Name of the multipart field carrying the resume.
pub const FILE_FIELD: &str = "file";

pub struct UploadedFile {
    pub file: NamedTempFile,
    pub filename: String,
    pub format: DocumentFormat,
    pub size: usize,
}

/// Reads the request's `file` field into a temp file.
pub async fn receive_upload(
    mut multipart: Multipart,
    config: &Config,
) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, config))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let filename = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::Validation("No filename provided".to_string()))?
            .to_string();
        let format = DocumentFormat::from_filename(&filename)?;

        let (file, size) = spool(field, config).await?;
        if size == 0 {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        debug!("Received upload {filename} ({size} bytes)");
        return Ok(UploadedFile {
            file,
            filename,
            format,
            size,
        });
    }

    Err(AppError::Validation(format!(
        "No file provided: expected a multipart field named '{FILE_FIELD}'"
    )))
}

async fn spool(mut field: Field<'_>, config: &Config) -> Result<(NamedTempFile, usize), AppError> {
    let temp = NamedTempFile::new_in(&config.upload_dir).map_err(|e| {
        AppError::Internal(anyhow::Error::new(e).context("creating upload temp file"))
    })?;
    let mut out = tokio::fs::File::from_std(temp.reopen().map_err(|e| {
        AppError::Internal(anyhow::Error::new(e).context("opening upload temp file"))
    })?);

    let mut size = 0usize;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, config))?
    {
        size += chunk.len();
        if size > config.max_upload_bytes {
            warn!(
                "Upload rejected: exceeds {} bytes",
                config.max_upload_bytes
            );
            return Err(too_large(config));
        }
        out.write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("writing upload")))?;
    }
    out.flush()
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("flushing upload")))?;

    Ok((temp, size))
}

fn too_large(config: &Config) -> AppError {
    AppError::PayloadTooLarge {
        limit_bytes: config.max_upload_bytes as u64,
    }
}

fn multipart_error(e: MultipartError, config: &Config) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(config)
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// Extracts text from the spooled file on the blocking pool.
pub async fn extract_upload(upload: &UploadedFile) -> Result<String, AppError> {
    let path = upload.file.path().to_path_buf();
    let format = upload.format;
    let text = tokio::task::spawn_blocking(move || extract_file(&path, format))
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("extraction task failed")))??;
    Ok(text)
}
