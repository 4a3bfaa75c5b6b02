// src/routes/health.rs
//! API health check endpoint.
//!
//! Used by container orchestrators and CI to verify that the service is up.
//! It never calls the weather provider; it only reports whether a provider
//! credential is configured.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    weather_configured: bool,
}

/// Handle `GET /health`.
async fn health(State((config, _)): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        weather_configured: config.weather_api_key.is_some(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
