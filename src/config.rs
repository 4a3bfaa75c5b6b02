//! Configuration loader for the `safehome-risk` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). The resulting [`Config`] is handed to the router
//! and to the weather client at construction time; nothing else reads the
//! environment.
use std::{env, path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};

/// Default OpenWeatherMap "current weather" endpoint.
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env_num {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable, treating blank values as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// TCP port the HTTP server binds to.
    pub port: u16,

    /// Directory where uploaded images are persisted.
    pub upload_dir: PathBuf,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,

    /// Weather provider endpoint (current conditions).
    pub weather_api_url: String,

    /// Weather provider credential. Weather lookups fail as "unavailable"
    /// when this is absent.
    pub weather_api_key: Option<String>,

    /// Upper bound for a single weather provider call.
    pub weather_timeout: Duration,

    /// Largest image width, in pixels, the decoder accepts.
    pub max_image_width: u32,

    /// Largest image height, in pixels, the decoder accepts.
    pub max_image_height: u32,

    /// Memory the decoder may allocate for one image, in bytes.
    pub max_decode_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 10000,
            upload_dir: PathBuf::from("static/uploads"),
            max_upload_bytes: 16 * 1024 * 1024,
            weather_api_url: DEFAULT_WEATHER_API_URL.to_string(),
            weather_api_key: None,
            weather_timeout: Duration::from_secs(10),
            max_image_width: 8000,
            max_image_height: 8000,
            max_decode_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `PORT` – listen port (default: 10000)
/// - `UPLOAD_DIR` – upload directory (default: `static/uploads`)
/// - `MAX_UPLOAD_BYTES` – upload cap (default: 16 MiB)
/// - `WEATHER_API_URL` – provider endpoint (default: OpenWeatherMap)
/// - `WEATHER_API_KEY` – provider credential (default: unset)
/// - `WEATHER_TIMEOUT_SECS` – provider timeout (default: 10)
/// - `MAX_IMAGE_WIDTH` / `MAX_IMAGE_HEIGHT` – decode dimension caps (default: 8000)
/// - `MAX_DECODE_BYTES` – decoder allocation cap (default: 256 MiB)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let port = parse_env_num!("PORT", u16, defaults.port);
    let max_upload_bytes =
        parse_env_num!("MAX_UPLOAD_BYTES", usize, defaults.max_upload_bytes);
    let timeout_secs = parse_env_num!(
        "WEATHER_TIMEOUT_SECS",
        u64,
        defaults.weather_timeout.as_secs()
    );

    let max_image_width = parse_env_num!("MAX_IMAGE_WIDTH", u32, defaults.max_image_width);
    let max_image_height = parse_env_num!("MAX_IMAGE_HEIGHT", u32, defaults.max_image_height);
    let max_decode_bytes = parse_env_num!("MAX_DECODE_BYTES", u64, defaults.max_decode_bytes);

    if max_upload_bytes == 0 {
        return Err(anyhow!("MAX_UPLOAD_BYTES must be greater than zero"));
    }
    if timeout_secs == 0 {
        return Err(anyhow!("WEATHER_TIMEOUT_SECS must be greater than zero"));
    }
    if max_image_width == 0 || max_image_height == 0 || max_decode_bytes == 0 {
        return Err(anyhow!("Image decode limits must be greater than zero"));
    }

    let upload_dir = optional_env!("UPLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.upload_dir);
    let weather_api_url = optional_env!("WEATHER_API_URL").unwrap_or(defaults.weather_api_url);
    let weather_api_key = optional_env!("WEATHER_API_KEY");

    Ok(Config {
        port,
        upload_dir,
        max_upload_bytes,
        weather_api_url,
        weather_api_key,
        weather_timeout: Duration::from_secs(timeout_secs),
        max_image_width,
        max_image_height,
        max_decode_bytes,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// The weather API key is never printed, only whether one is set.
    pub fn log_config(&self) {
        // ---
        let masked_key = match &self.weather_api_key {
            Some(_) => "****",
            None => "(not set)",
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  PORT                 : {}", self.port);
        tracing::info!("  UPLOAD_DIR           : {}", self.upload_dir.display());
        tracing::info!("  MAX_UPLOAD_BYTES     : {}", self.max_upload_bytes);
        tracing::info!("  WEATHER_API_URL      : {}", self.weather_api_url);
        tracing::info!("  WEATHER_API_KEY      : {}", masked_key);
        tracing::info!(
            "  WEATHER_TIMEOUT_SECS : {}",
            self.weather_timeout.as_secs()
        );
        tracing::info!("  MAX_IMAGE_WIDTH      : {}", self.max_image_width);
        tracing::info!("  MAX_IMAGE_HEIGHT     : {}", self.max_image_height);
        tracing::info!("  MAX_DECODE_BYTES     : {}", self.max_decode_bytes);
    }
}
