use axum::{
    extract::{multipart::MultipartRejection, rejection::QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::extract::ExtractError;
use crate::github::GitHubError;
use crate::llm_client::LlmError;

/// Raw LLM output attached to a malformed-response error body is cut here.
const RAW_DETAIL_LIMIT: usize = 2000;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// This is the only place HTTP status codes are chosen.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    ParseFailure(String),

    #[error("Insufficient text content: extracted {length} characters, at least {minimum} required")]
    InsufficientText { length: usize, minimum: usize },

    #[error("{0}")]
    InvalidUsername(String),

    #[error("File too large. Maximum size is {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: u64 },

    #[error("{0}")]
    UserNotFound(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("{message}")]
    RateLimited {
        message: String,
        reset_at: Option<DateTime<Utc>>,
        retry_after_secs: Option<u64>,
    },

    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("AI analysis returned an invalid response: {reason}")]
    MalformedLlmResponse { reason: String, raw: String },

    #[error("{0} request timed out")]
    Timeout(&'static str),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::UnsupportedFormat(_)
            | AppError::ParseFailure(_)
            | AppError::InsufficientText { .. }
            | AppError::InvalidUsername(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { .. } | AppError::MalformedLlmResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            AppError::ParseFailure(_) => "PARSE_FAILURE",
            AppError::InsufficientText { .. } => "INSUFFICIENT_TEXT",
            AppError::InvalidUsername(_) => "INVALID_USERNAME",
            AppError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::UserNotFound(_) => "USER_NOT_FOUND",
            AppError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::Upstream { .. } => "UPSTREAM_ERROR",
            AppError::MalformedLlmResponse { .. } => "MALFORMED_LLM_RESPONSE",
            AppError::Timeout(_) => "UPSTREAM_TIMEOUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::MalformedLlmResponse { reason, raw } => {
                let raw: String = raw.chars().take(RAW_DETAIL_LIMIT).collect();
                Some(json!({ "reason": reason, "raw_response": raw }))
            }
            AppError::RateLimited {
                reset_at: Some(reset_at),
                ..
            } => Some(json!({ "retry_at": reset_at.to_rfc3339() })),
            _ => None,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            AppError::RateLimited {
                retry_after_secs: Some(secs),
                ..
            } => Some(*secs),
            AppError::RateLimited {
                reset_at: Some(reset_at),
                ..
            } => Some((*reset_at - Utc::now()).num_seconds().max(0) as u64),
            _ => None,
        }
    }

    /// The `{status, code, message}` object used when an error is embedded in
    /// an otherwise successful response.
    pub fn to_embedded(&self) -> Value {
        json!({
            "status": "error",
            "code": self.code(),
            "message": self.message(),
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            AppError::Upstream { .. }
            | AppError::MalformedLlmResponse { .. }
            | AppError::Timeout(_) => tracing::error!("{self}"),
            _ => tracing::debug!("Request rejected ({status}): {self}"),
        }

        let mut body = json!({
            "status": "error",
            "code": self.code(),
            "message": self.message(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after() {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        AppError::Validation(format!("Expected a multipart/form-data body: {}", e.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query string: {}", e.body_text()))
    }
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::UnsupportedFormat(_) => AppError::UnsupportedFormat(e.to_string()),
            ExtractError::ParseFailure { .. } => AppError::ParseFailure(e.to_string()),
            ExtractError::Io(io) => {
                AppError::Internal(anyhow::Error::new(io).context("reading uploaded file"))
            }
        }
    }
}

impl From<GitHubError> for AppError {
    fn from(e: GitHubError) -> Self {
        match e {
            GitHubError::InvalidUsername(_) => AppError::InvalidUsername(e.to_string()),
            GitHubError::UserNotFound(_) => AppError::UserNotFound(e.to_string()),
            GitHubError::RateLimited {
                reset_at,
                retry_after_secs,
            } => AppError::RateLimited {
                message: e.to_string(),
                reset_at,
                retry_after_secs,
            },
            GitHubError::Timeout => AppError::Timeout("GitHub API"),
            GitHubError::Network(_) | GitHubError::Api { .. } | GitHubError::Decode(_) => {
                AppError::Upstream {
                    service: "GitHub API",
                    message: e.to_string(),
                }
            }
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout => AppError::Timeout("AI analysis"),
            other => AppError::Upstream {
                service: "AI analysis",
                message: other.to_string(),
            },
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Request(llm) => llm.into(),
            AnalysisError::Malformed { raw, reason } => {
                AppError::MalformedLlmResponse { reason, raw }
            }
            AnalysisError::Internal(e) => AppError::Internal(e),
        }
    }
}
