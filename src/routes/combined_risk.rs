use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{success, AppState};
use crate::{
    combined,
    models::{Alert, CombinedRisk, RiskLevel, WeatherOutcome},
    weather::Coordinates,
    ApiError,
};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/combined-risk", post(handler))
}

/// Request body for `POST /combined-risk`.
///
/// Coordinates are optional; without them weather contributes nothing.
#[derive(Debug, Deserialize)]
pub struct CombinedRequest {
    risk_level: RiskLevel,
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum WeatherStatus {
    Available,
    Unavailable,
}

#[derive(Debug, Serialize)]
struct CombinedResponse {
    risk_level: RiskLevel,
    #[serde(flatten)]
    combined: CombinedRisk,
    weather_status: WeatherStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    weather_error: Option<String>,
    alerts: Vec<Alert>,
}

async fn handler(
    State((_, weather)): State<AppState>,
    body: Result<Json<CombinedRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!("POST /combined-risk - {:?}", request);

    let outcome = match (request.lat, request.lng) {
        (None, None) => WeatherOutcome::Unavailable {
            reason: "no coordinates supplied".to_string(),
        },
        (lat, lng) => {
            // Bad coordinates are the caller's fault, not an outage
            let coords = Coordinates::from_parts(lat, lng)?;
            match weather.report(coords).await {
                Ok(report) => WeatherOutcome::Available(report),
                Err(e) => {
                    warn!("Weather unavailable, scoring structure only: {}", e);
                    WeatherOutcome::Unavailable {
                        reason: e.to_string(),
                    }
                }
            }
        }
    };

    let combined = combined::combine(request.risk_level, &outcome);

    let (weather_status, weather_error, alerts) = match outcome {
        WeatherOutcome::Available(report) => (WeatherStatus::Available, None, report.alerts),
        WeatherOutcome::Unavailable { reason } => {
            (WeatherStatus::Unavailable, Some(reason), Vec::new())
        }
    };

    Ok(success(CombinedResponse {
        risk_level: request.risk_level,
        combined,
        weather_status,
        weather_error,
        alerts,
    }))
}
