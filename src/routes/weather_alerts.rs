use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;

use super::{success, AppState};
use crate::{weather::Coordinates, ApiError};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/weather-alerts", get(handler))
}

/// Query parameters for `GET /weather-alerts`.
#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    lat: Option<f64>,
    lng: Option<f64>,
}

async fn handler(
    State((_, weather)): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    let Query(params) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!("GET /weather-alerts - {:?}", params);

    // Rejected here, before the provider is ever called
    let coords = Coordinates::from_parts(params.lat, params.lng)?;
    let report = weather.report(coords).await?;

    Ok(success(report))
}
