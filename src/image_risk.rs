//! Image risk analyzer.
//!
//! One entry point per input shape: [`analyze_bytes`] decodes and measures an
//! uploaded image, [`analyze_metrics`] scores precomputed [`ImageMetrics`].
//! The [`AnalysisMode`] selects the scoring strategy.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::imaging::{self, DecodeLimits};
use crate::models::{
    AnalysisMode, CrackAnalysis, ImageMetrics, Issue, Priority, Recommendation, RiskLevel,
    RiskReport, SeverityDistribution, TechnicalData,
};

// ---

/// Files smaller than this are flagged as low resolution.
pub const LOW_RESOLUTION_BYTES: u64 = 100_000;

/// Brightness (0–100) below which an image is flagged as too dark.
pub const DARK_THRESHOLD: f64 = 50.0;

/// Laplacian variance below which an image is flagged as blurry.
pub const BLUR_THRESHOLD: f64 = 50.0;

/// Fewer rectangular structures than this adds structural risk.
pub const MIN_RECTANGULAR_STRUCTURES: u32 = 2;

pub const ASPECT_RATIO_RANGE: (f64, f64) = (0.5, 2.0);

/// Bytes of file per synthetic crack in simulated mode.
pub const SIMULATED_BYTES_PER_CRACK: u64 = 50_000;
pub const SIMULATED_MIN_CRACKS: u64 = 3;
/// Centimetres of synthetic crack per crack.
pub const SIMULATED_CM_PER_CRACK: f64 = 8.7;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unreadable image data: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decode and analyze an uploaded image.
///
/// Images whose dimensions or decoded size exceed `limits` fail with
/// [`AnalysisError::Decode`] before any pixel buffer is allocated.
pub fn analyze_bytes(
    bytes: &[u8],
    mode: AnalysisMode,
    limits: DecodeLimits,
) -> Result<RiskReport, AnalysisError> {
    // ---
    let structure = mode == AnalysisMode::QualityStructure;
    let metrics = imaging::measure(bytes, structure, limits)?;

    tracing::debug!(
        ?mode,
        width = metrics.width,
        height = metrics.height,
        file_size = metrics.file_size,
        brightness = metrics.brightness,
        "Image measured"
    );

    Ok(analyze_metrics(&metrics, mode))
}

/// Score precomputed metrics with the selected strategy.
pub fn analyze_metrics(metrics: &ImageMetrics, mode: AnalysisMode) -> RiskReport {
    // ---
    let scored = match mode {
        AnalysisMode::Quality => score_quality(metrics),
        AnalysisMode::QualityStructure => score_structure(metrics),
        AnalysisMode::Simulated => score_simulated(metrics.file_size),
    };

    RiskReport {
        analysis_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        mode,
        simulated: mode == AnalysisMode::Simulated,
        risk_level: scored.level,
        risk_score: scored.score,
        issues_detected: scored.issues,
        recommendations: scored.recommendations,
        technical_data: TechnicalData::from(metrics),
        crack_analysis: scored.cracks,
    }
}

/// Strategy output before the report envelope is attached.
#[derive(Debug)]
struct Scored {
    level: RiskLevel,
    score: f64,
    issues: Vec<Issue>,
    recommendations: Vec<Recommendation>,
    cracks: Option<CrackAnalysis>,
}

fn quality_recommendation(issue: &str, action: &str, priority: Priority) -> Recommendation {
    Recommendation {
        category: "image_quality".to_string(),
        issue: issue.to_string(),
        action: action.to_string(),
        priority,
        timeframe: "Before next analysis".to_string(),
    }
}

/// Flags shared by both quality strategies.
fn low_light(
    metrics: &ImageMetrics,
    issues: &mut Vec<Issue>,
    recs: &mut Vec<Recommendation>,
) -> bool {
    // ---
    let dark = metrics.brightness < DARK_THRESHOLD;
    if dark {
        issues.push(Issue::new("too dark", "Image is too dark"));
        recs.push(quality_recommendation(
            "too dark",
            "Take the photo with better natural lighting",
            Priority::Medium,
        ));
    }
    dark
}

fn no_findings(issues: &mut Vec<Issue>, recs: &mut Vec<Recommendation>) {
    // ---
    issues.push(Issue::new(
        "none",
        "No evident problems were detected in the provided image",
    ));
    recs.push(quality_recommendation(
        "none",
        "For a more detailed analysis, provide several angles of the property",
        Priority::Low,
    ));
}

fn score_quality(metrics: &ImageMetrics) -> Scored {
    // ---
    let mut issues = Vec::new();
    let mut recs = Vec::new();
    let mut flags = 0u32;

    if metrics.file_size < LOW_RESOLUTION_BYTES {
        flags += 1;
        issues.push(Issue::new(
            "low resolution",
            "Image has low resolution or quality",
        ));
        recs.push(quality_recommendation(
            "low resolution",
            "Take a higher resolution photo for a more precise analysis",
            Priority::Medium,
        ));
    }

    if low_light(metrics, &mut issues, &mut recs) {
        flags += 1;
    }

    let ratio = metrics.aspect_ratio();
    if ratio < ASPECT_RATIO_RANGE.0 || ratio > ASPECT_RATIO_RANGE.1 {
        flags += 1;
        issues.push(Issue::new(
            "unusual composition",
            "Image composition is unusual",
        ));
        recs.push(quality_recommendation(
            "unusual composition",
            "Take the photo showing the whole front facade",
            Priority::Low,
        ));
    }

    if issues.is_empty() {
        no_findings(&mut issues, &mut recs);
    }

    Scored {
        level: quality_level(flags),
        score: flags as f64,
        issues,
        recommendations: recs,
        cracks: None,
    }
}

fn quality_level(flags: u32) -> RiskLevel {
    match flags {
        0 => RiskLevel::Low,
        1 => RiskLevel::Moderate,
        _ => RiskLevel::High,
    }
}

fn score_structure(metrics: &ImageMetrics) -> Scored {
    // ---
    let mut issues = Vec::new();
    let mut recs = Vec::new();
    let mut score = 0u32;

    // Missing blur figures mean the image was never inspected; treat as sharp.
    let blur = metrics.blur_score.unwrap_or(f64::INFINITY);
    if blur < BLUR_THRESHOLD {
        score += 1;
        issues.push(Issue::new("blurry", "Image is out of focus"));
        recs.push(quality_recommendation(
            "blurry",
            "Hold the camera steady and refocus before taking the photo",
            Priority::Medium,
        ));
    }

    if low_light(metrics, &mut issues, &mut recs) {
        score += 1;
    }

    let rectangular = metrics.rectangular_count.unwrap_or(0);
    if rectangular < MIN_RECTANGULAR_STRUCTURES {
        score += 2;
        issues.push(Issue::new(
            "structure",
            format!("Only {rectangular} rectangular structure(s) identified"),
        ));
        recs.push(Recommendation {
            category: "structure".to_string(),
            issue: "few rectangular structures".to_string(),
            action: "Photograph the facade straight on so walls, doors and windows are visible"
                .to_string(),
            priority: Priority::High,
            timeframe: "Before next analysis".to_string(),
        });
    }

    if issues.is_empty() {
        no_findings(&mut issues, &mut recs);
    }

    Scored {
        level: structure_level(score),
        score: score as f64,
        issues,
        recommendations: recs,
        cracks: None,
    }
}

fn structure_level(score: u32) -> RiskLevel {
    match score {
        0 => RiskLevel::Low,
        1 => RiskLevel::Moderate,
        2 => RiskLevel::ModerateHigh,
        _ => RiskLevel::High,
    }
}

/// Synthetic crack figures for a file of `file_size` bytes.
pub fn simulated_cracks(file_size: u64) -> CrackAnalysis {
    // ---
    let count = SIMULATED_MIN_CRACKS.max(file_size / SIMULATED_BYTES_PER_CRACK);
    CrackAnalysis {
        crack_count: count,
        total_length: count as f64 * SIMULATED_CM_PER_CRACK,
        severity_distribution: SeverityDistribution {
            low: count / 2,
            medium: count / 3,
            high: count / 6,
        },
    }
}

pub fn simulated_score(cracks: &CrackAnalysis) -> f64 {
    let dist = &cracks.severity_distribution;
    dist.high as f64 * 3.0 + dist.medium as f64 * 1.5 + cracks.total_length / 100.0
}

fn simulated_level(score: f64) -> RiskLevel {
    if score > 50.0 {
        RiskLevel::Critical
    } else if score > 25.0 {
        RiskLevel::High
    } else if score > 10.0 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

fn structural_recommendation(
    issue: &str,
    action: &str,
    priority: Priority,
    timeframe: &str,
) -> Recommendation {
    Recommendation {
        category: "structural".to_string(),
        issue: issue.to_string(),
        action: action.to_string(),
        priority,
        timeframe: timeframe.to_string(),
    }
}

fn score_simulated(file_size: u64) -> Scored {
    // ---
    let cracks = simulated_cracks(file_size);
    let score = simulated_score(&cracks);
    let high = cracks.severity_distribution.high;

    let mut issues = vec![Issue::new(
        "simulated",
        "Crack figures are simulated from file size; no structural inspection was performed",
    )];
    let mut recs = Vec::new();

    if high > 8 {
        issues.push(Issue::new(
            "high severity cracks",
            format!("{high} high-severity cracks suggest serious structural damage"),
        ));
        recs.push(structural_recommendation(
            "high severity cracks",
            "Have a licensed structural engineer inspect the building immediately",
            Priority::Critical,
            "Immediately",
        ));
    } else if high > 4 {
        issues.push(Issue::new(
            "high severity cracks",
            format!("{high} high-severity cracks require professional evaluation"),
        ));
        recs.push(structural_recommendation(
            "high severity cracks",
            "Schedule a professional structural evaluation",
            Priority::High,
            "Within 1 week",
        ));
    }

    if cracks.total_length > 800.0 {
        issues.push(Issue::new(
            "extensive cracking",
            format!("{:.1} cm of total crack length", cracks.total_length),
        ));
        recs.push(structural_recommendation(
            "extensive cracking",
            "Seal and monitor all cracks and assess wall stability",
            Priority::High,
            "Within 2 weeks",
        ));
    } else if cracks.total_length > 400.0 {
        issues.push(Issue::new(
            "moderate cracking",
            format!("{:.1} cm of total crack length", cracks.total_length),
        ));
        recs.push(structural_recommendation(
            "moderate cracking",
            "Seal visible cracks and monitor them for growth",
            Priority::Medium,
            "Within 1 month",
        ));
    }

    if cracks.crack_count > 80 {
        issues.push(Issue::new(
            "widespread cracking",
            format!("{} cracks distributed across the structure", cracks.crack_count),
        ));
        recs.push(structural_recommendation(
            "widespread cracking",
            "Commission a full structural survey of the property",
            Priority::High,
            "Within 1 month",
        ));
    }

    recs.push(Recommendation {
        category: "preventive".to_string(),
        issue: "maintenance".to_string(),
        action: "Inspect walls and foundations for new cracks every 6 months".to_string(),
        priority: Priority::Low,
        timeframe: "Every 6 months".to_string(),
    });
    recs.push(Recommendation {
        category: "preventive".to_string(),
        issue: "emergency preparedness".to_string(),
        action: "Keep an emergency kit and evacuation plan up to date".to_string(),
        priority: Priority::Low,
        timeframe: "Every 6 months".to_string(),
    });

    Scored {
        level: simulated_level(score),
        score,
        issues,
        recommendations: recs,
        cracks: Some(cracks),
    }
}
