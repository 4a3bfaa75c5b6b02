//! Data models shared by the analyzers and the HTTP routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---

/// Strategy used by the image risk analyzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Brightness, file size and aspect ratio only.
    #[default]
    Quality,
    /// Quality checks plus blur and rectangular-contour detection.
    QualityStructure,
    /// Synthetic crack figures derived from file size. No pixel inspection.
    Simulated,
}

/// Ordered structural risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    None,
    Low,
    Moderate,
    #[serde(rename = "Moderate-High")]
    ModerateHigh,
    High,
    Critical,
}

/// Measurements taken from one uploaded image.
///
/// Structure fields are only populated by [`AnalysisMode::QualityStructure`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetrics {
    // ---
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    /// Mean luma on a 0–100 scale.
    pub brightness: f64,
    pub edge_count: Option<u64>,
    pub contour_count: Option<u32>,
    pub rectangular_count: Option<u32>,
    /// Variance of the Laplacian. Lower is blurrier.
    pub blur_score: Option<f64>,
}

impl ImageMetrics {
    /// Metrics for an image whose pixels were not inspected beyond size.
    pub fn basic(width: u32, height: u32, file_size: u64, brightness: f64) -> Self {
        Self {
            width,
            height,
            file_size,
            brightness,
            edge_count: None,
            contour_count: None,
            rectangular_count: None,
            blur_score: None,
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub category: String,
    pub description: String,
}

impl Issue {
    pub fn new(category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub issue: String,
    pub action: String,
    pub priority: Priority,
    pub timeframe: String,
}

/// Human-readable measurements echoed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalData {
    pub image_resolution: String,
    pub file_size: String,
    pub brightness_level: String,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contours: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rectangular_structures: Option<u32>,
}

impl From<&ImageMetrics> for TechnicalData {
    fn from(m: &ImageMetrics) -> Self {
        TechnicalData {
            image_resolution: format!("{}x{}", m.width, m.height),
            file_size: format!("{:.1} KB", m.file_size as f64 / 1024.0),
            brightness_level: format!("{:.1}%", m.brightness),
            aspect_ratio: format!("{:.2}", m.aspect_ratio()),
            blur_score: m.blur_score.map(|b| format!("{b:.1}")),
            contours: m.contour_count,
            rectangular_structures: m.rectangular_count,
        }
    }
}

/// Crack counts bucketed by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

/// Synthetic crack figures produced by [`AnalysisMode::Simulated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrackAnalysis {
    pub crack_count: u64,
    /// Centimetres.
    pub total_length: f64,
    pub severity_distribution: SeverityDistribution,
}

/// Outcome of one image analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    // ---
    pub analysis_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub mode: AnalysisMode,
    /// True when the findings are fabricated rather than measured.
    pub simulated: bool,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub issues_detected: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
    pub technical_data: TechnicalData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crack_analysis: Option<CrackAnalysis>,
}

/// Current conditions returned by the weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub humidity: f64,
    /// Metres per second.
    pub wind_speed: f64,
    pub condition: String,
    pub description: String,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Rain,
    Wind,
    Heat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub description: String,
    pub severity: AlertSeverity,
    pub actions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Weather lookup for one coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub latitude: f64,
    pub longitude: f64,
    pub conditions: WeatherSnapshot,
    pub alerts: Vec<Alert>,
}

/// Weather input to the combined aggregator.
///
/// A failed lookup is carried explicitly instead of as an empty alert list.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherOutcome {
    Available(WeatherReport),
    Unavailable { reason: String },
}

/// Combined risk category, indexed by total ordinal 0..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CombinedCategory {
    Minimal,
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
    Critical,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedRisk {
    pub structural_ordinal: u8,
    pub weather_ordinal: u8,
    pub total: u8,
    pub category: CombinedCategory,
    pub recommendation: String,
}
