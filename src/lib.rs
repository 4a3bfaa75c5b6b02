//! House structural and weather risk service.
//!
//! Module map (each module owns one concern; `routes` is the only HTTP-aware
//! gateway besides `error`):
//! - `config`     – environment-driven [`Config`]
//! - `models`     – data model shared by analyzers and routes
//! - `imaging`    – pixel measurements (brightness, blur, contours)
//! - `image_risk` – image risk analyzer and its three strategies
//! - `weather`    – weather provider client and alert rules
//! - `combined`   – combined risk aggregator
//! - `upload`     – upload validation and storage
//! - `error`      – JSON error responses
//! - `routes`     – HTTP router
use anyhow::Result;
use axum::Router;

pub mod combined;
pub mod config;
pub mod error;
pub mod image_risk;
pub mod imaging;
pub mod models;
pub mod routes;
pub mod upload;
pub mod weather;

pub use config::Config;
pub use error::ApiError;
pub use weather::WeatherClient;

// ---

/// Build the complete application router from a configuration snapshot.
pub fn app(config: Config) -> Result<Router> {
    // ---
    let weather = WeatherClient::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to build weather client: {}", e))?;
    Ok(routes::router(config, weather))
}
