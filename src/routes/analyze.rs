use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::{rejection::QueryRejection, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{success, AppState};
use crate::{
    image_risk,
    imaging::DecodeLimits,
    models::{AnalysisMode, RiskReport},
    upload::{self, UploadError},
    ApiError,
};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/analyze", post(handler))
}

/// Query parameters for `POST /analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    mode: AnalysisMode,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    #[serde(flatten)]
    report: RiskReport,
    image_url: String,
}

/// The `image` field of the multipart body.
struct ImageUpload {
    filename: String,
    bytes: Vec<u8>,
}

async fn handler(
    State((config, _)): State<AppState>,
    query: Result<Query<AnalyzeQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    let Query(params) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    info!(mode = ?params.mode, "POST /analyze");

    // Step 1: validate the upload before touching the disk
    let image = read_image_field(multipart, config.max_upload_bytes).await?;
    upload::validate_filename(&image.filename)?;
    upload::check_size(image.bytes.len(), config.max_upload_bytes)?;

    // Step 2: analyze off the async executor; undecodable images never reach the disk
    let mode = params.mode;
    let limits = DecodeLimits::from(&config);
    let ImageUpload { filename, bytes } = image;
    let (report, bytes) = tokio::task::spawn_blocking(move || {
        let report = image_risk::analyze_bytes(&bytes, mode, limits);
        (report, bytes)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("analysis task failed: {e}")))?;
    let report = report?;

    // Step 3: persist
    let stored = upload::store(&config.upload_dir, &filename, &bytes).await?;
    debug!(name = %stored.name, "POST /analyze - stored");

    info!(
        analysis_id = %report.analysis_id,
        risk_level = ?report.risk_level,
        risk_score = report.risk_score,
        "Image analysis complete"
    );

    Ok(success(AnalyzeResponse {
        report,
        image_url: stored.public_url(),
    }))
}

/// Pull the `image` field out of the multipart body, ignoring other fields.
async fn read_image_field(
    mut multipart: Multipart,
    limit: usize,
) -> Result<ImageUpload, ApiError> {
    // ---
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.trim().is_empty() {
            return Err(UploadError::EmptyFilename.into());
        }

        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::from(UploadError::TooLarge {
                    size: limit.saturating_add(1),
                    limit,
                })
            } else {
                multipart_error(e)
            }
        })?;

        return Ok(ImageUpload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(UploadError::MissingFile.into())
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}
