//! Unified API error handling.
//!
//! Every failed request is answered with the same JSON shape:
//! `{"status": "error", "error": "<code>", "message": "<text>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::image_risk::AnalysisError;
use crate::upload::UploadError;
use crate::weather::WeatherError;

// ---

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rejected before any analysis ran (400).
    #[error("{0}")]
    BadRequest(String),

    /// Upload exceeds the configured cap (413).
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Image could not be decoded (422).
    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    /// Weather provider failed or is not configured (502 / 504).
    #[error("{0}")]
    Weather(WeatherError),

    /// Unknown route (404).
    #[error("endpoint not found")]
    NotFound,

    /// Anything else (500).
    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::TooLarge { .. } => ApiError::PayloadTooLarge(e.to_string()),
            UploadError::Io(_) => ApiError::Internal(e.to_string()),
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        if e.is_validation() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Weather(e)
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Analysis(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Weather(WeatherError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Weather(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Analysis(_) => "analysis_failed",
            ApiError::Weather(_) => "weather_unavailable",
            ApiError::NotFound => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = self.code(), status = status.as_u16(), "{}", self);
        } else {
            tracing::warn!(error = self.code(), status = status.as_u16(), "{}", self);
        }

        let body = ErrorResponse {
            status: "error",
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
