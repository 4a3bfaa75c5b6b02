//! Weather alert analyzer.
//!
//! Fetches current conditions for a coordinate pair from an
//! OpenWeatherMap-compatible provider and maps them onto typed alerts.
//! Failures are returned as [`WeatherError`], never as an empty alert list.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Alert, AlertKind, AlertSeverity, WeatherReport, WeatherSnapshot};
use crate::Config;

// ---

pub const WIND_ALERT_MS: f64 = 10.0;
pub const WIND_HIGH_MS: f64 = 15.0;
pub const RAIN_HIGH_HUMIDITY: f64 = 80.0;
pub const HEAT_ALERT_C: f64 = 35.0;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("weather provider credential is not configured")]
    MissingApiKey,

    #[error("weather provider did not answer in time")]
    Timeout,

    #[error("weather provider unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("weather provider returned HTTP {0}")]
    Status(u16),

    #[error("malformed weather payload: {0}")]
    Payload(String),
}

impl WeatherError {
    /// True for caller mistakes, false for provider-side failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, WeatherError::InvalidCoordinates(_))
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WeatherError::Timeout
        } else {
            WeatherError::Transport(e)
        }
    }
}

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Coordinates {
    /// Accepts `lat ∈ [-90, 90]` and `lng ∈ [-180, 180]`.
    pub fn new(lat: f64, lng: f64) -> Result<Self, WeatherError> {
        // ---
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(WeatherError::InvalidCoordinates(format!(
                "latitude {lat} outside [-90, 90]"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(WeatherError::InvalidCoordinates(format!(
                "longitude {lng} outside [-180, 180]"
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Validate optional query values, rejecting missing ones.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Result<Self, WeatherError> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::new(lat, lng),
            _ => Err(WeatherError::InvalidCoordinates(
                "both lat and lng are required".to_string(),
            )),
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

/// Provider payload, reduced to the fields the alerts need.
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    weather: Vec<ProviderCondition>,
    wind: ProviderWind,
    main: ProviderMain,
}

#[derive(Debug, Deserialize)]
struct ProviderCondition {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ProviderWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderMain {
    temp: f64,
    humidity: f64,
}

/// Parse a provider body into a snapshot stamped with `retrieved_at`.
pub fn parse_snapshot(
    body: &[u8],
    retrieved_at: DateTime<Utc>,
) -> Result<WeatherSnapshot, WeatherError> {
    // ---
    let raw: ProviderResponse =
        serde_json::from_slice(body).map_err(|e| WeatherError::Payload(e.to_string()))?;

    let condition = raw
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::Payload("empty 'weather' array".to_string()))?;

    Ok(WeatherSnapshot {
        temperature_c: raw.main.temp,
        humidity: raw.main.humidity,
        wind_speed: raw.wind.speed,
        condition: condition.main,
        description: condition.description,
        retrieved_at,
    })
}

/// HTTP client for the weather provider.
///
/// Cheap to clone; every clone shares one connection pool.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl WeatherClient {
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        // ---
        let http = reqwest::Client::builder()
            .timeout(config.weather_timeout)
            .build()
            .map_err(WeatherError::Transport)?;

        Ok(Self {
            http,
            api_url: config.weather_api_url.clone(),
            api_key: config.weather_api_key.clone(),
        })
    }

    /// Fetch current conditions at `coords`.
    pub async fn current(&self, coords: Coordinates) -> Result<WeatherSnapshot, WeatherError> {
        // ---
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;

        tracing::debug!(lat = coords.lat, lng = coords.lng, "Fetching current weather");

        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lng.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_snapshot(&body, Utc::now())
    }

    /// Fetch conditions and derive alerts.
    pub async fn report(&self, coords: Coordinates) -> Result<WeatherReport, WeatherError> {
        // ---
        let conditions = self.current(coords).await?;
        let alerts = derive_alerts(&conditions);

        tracing::info!(
            lat = coords.lat,
            lng = coords.lng,
            alerts = alerts.len(),
            "Weather analysis complete"
        );

        Ok(WeatherReport {
            latitude: coords.lat,
            longitude: coords.lng,
            conditions,
            alerts,
        })
    }
}

fn indicates_rain(snapshot: &WeatherSnapshot) -> bool {
    let text = format!("{} {}", snapshot.condition, snapshot.description).to_lowercase();
    text.contains("rain") || text.contains("thunderstorm")
}

fn actions(kind: AlertKind) -> Vec<String> {
    let list: &[&str] = match kind {
        AlertKind::Rain => &[
            "Clear gutters and downspouts",
            "Check the roof and windows for leaks",
            "Move valuables away from flood-prone areas",
        ],
        AlertKind::Wind => &[
            "Secure or bring in loose outdoor objects",
            "Close and latch windows and shutters",
            "Stay away from large windows and trees",
        ],
        AlertKind::Heat => &[
            "Stay hydrated and avoid the midday sun",
            "Ventilate the house and check on vulnerable occupants",
            "Watch for new cracks in walls and roofing",
        ],
    };
    list.iter().map(|s| s.to_string()).collect()
}

/// Map one snapshot onto zero or more alerts.
pub fn derive_alerts(snapshot: &WeatherSnapshot) -> Vec<Alert> {
    // ---
    let mut alerts = Vec::new();
    let mut push = |kind, severity, description: String| {
        alerts.push(Alert {
            kind,
            description,
            severity,
            actions: actions(kind),
            timestamp: snapshot.retrieved_at,
        });
    };

    if indicates_rain(snapshot) {
        let severity = if snapshot.humidity > RAIN_HIGH_HUMIDITY {
            AlertSeverity::High
        } else {
            AlertSeverity::Moderate
        };
        push(
            AlertKind::Rain,
            severity,
            format!(
                "{} expected, humidity at {:.0}%",
                snapshot.description_or_condition(),
                snapshot.humidity
            ),
        );
    }

    if snapshot.wind_speed > WIND_ALERT_MS {
        let severity = if snapshot.wind_speed > WIND_HIGH_MS {
            AlertSeverity::High
        } else {
            AlertSeverity::Moderate
        };
        push(
            AlertKind::Wind,
            severity,
            format!("Strong winds of {:.1} m/s", snapshot.wind_speed),
        );
    }

    if snapshot.temperature_c > HEAT_ALERT_C {
        push(
            AlertKind::Heat,
            AlertSeverity::Moderate,
            format!("Extreme heat of {:.1} °C", snapshot.temperature_c),
        );
    }

    alerts
}

impl WeatherSnapshot {
    fn description_or_condition(&self) -> &str {
        if self.description.is_empty() {
            &self.condition
        } else {
            &self.description
        }
    }
}
