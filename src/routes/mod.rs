//! Route gateway: merges one sub-router per endpoint and attaches state.
use axum::{extract::DefaultBodyLimit, Json, Router};
use serde::Serialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{upload::PUBLIC_PREFIX, ApiError, Config, WeatherClient};

mod analyze;
mod combined_risk;
mod health;
mod weather_alerts;

// ---

/// Shared, read-only state handed to every handler.
pub(crate) type AppState = (Config, WeatherClient);

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(config: Config, weather: WeatherClient) -> Router {
    // ---
    let body_limit = config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let uploads = ServeDir::new(&config.upload_dir);

    Router::new()
        .merge(analyze::router())
        .merge(weather_alerts::router())
        .merge(combined_risk::router())
        .merge(health::router())
        .nest_service(PUBLIC_PREFIX, uploads)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state((config, weather))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Success envelope: `{"status": "success", ...body}`.
#[derive(Debug, Serialize)]
pub(crate) struct Success<T: Serialize> {
    status: &'static str,
    #[serde(flatten)]
    body: T,
}

pub(crate) fn success<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success {
        status: "success",
        body,
    })
}
