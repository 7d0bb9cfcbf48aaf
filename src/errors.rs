use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

/// Failures of the store itself. `AlreadyExists` is the contract that makes
/// concurrent creation safe; `NotFound` covers clicks against absent keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("shortcode already exists")]
    AlreadyExists,

    #[error("shortcode not found")]
    NotFound,
}

/// Failures while turning a creation request into a final shortcode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("shortcode must be alphanumeric and between 3-20 characters")]
    InvalidFormat,

    #[error("shortcode already exists")]
    Collision,

    #[error("unable to generate a unique shortcode")]
    GenerationExhausted,
}

/// Everything a handler can answer with besides a success. Each variant maps
/// to one HTTP status and a stable machine-readable code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid URL format. Please provide a valid URL.")]
    InvalidUrlFormat,

    #[error("Validity must be a positive integer representing minutes")]
    InvalidValidity,

    #[error("Shortcode must be alphanumeric and between 3-20 characters")]
    InvalidShortcodeFormat,

    #[error("Shortcode already exists. Please choose a different one.")]
    ShortcodeCollision,

    #[error("Unable to generate unique shortcode. Please try again.")]
    GenerationFailed,

    #[error("Shortcode not found")]
    NotFound,

    #[error("This short URL has expired")]
    Expired { expired_at: DateTime<Utc> },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidUrlFormat
            | ApiError::InvalidValidity
            | ApiError::InvalidShortcodeFormat => StatusCode::BAD_REQUEST,
            ApiError::ShortcodeCollision => StatusCode::CONFLICT,
            ApiError::GenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Expired { .. } => StatusCode::GONE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidUrlFormat => "INVALID_URL_FORMAT",
            ApiError::InvalidValidity => "INVALID_VALIDITY",
            ApiError::InvalidShortcodeFormat => "INVALID_SHORTCODE_FORMAT",
            ApiError::ShortcodeCollision => "SHORTCODE_COLLISION",
            ApiError::GenerationFailed => "SHORTCODE_GENERATION_FAILED",
            ApiError::NotFound => "SHORTCODE_NOT_FOUND",
            ApiError::Expired { .. } => "URL_EXPIRED",
        }
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidFormat => ApiError::InvalidShortcodeFormat,
            AllocationError::Collision => ApiError::ShortcodeCollision,
            AllocationError::GenerationExhausted => ApiError::GenerationFailed,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let ApiError::Expired { expired_at } = &self {
            body["expiredAt"] = json!(expired_at);
        }
        (self.status(), Json(body)).into_response()
    }
}
