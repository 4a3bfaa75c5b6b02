//! Combined risk aggregator: structural level + weather alerts → one label.

use crate::models::{AlertSeverity, CombinedCategory, CombinedRisk, RiskLevel, WeatherOutcome};

// ---

/// Weather contribution never exceeds this.
pub const WEATHER_ORDINAL_CAP: u8 = 3;

const CATEGORIES: [CombinedCategory; 8] = [
    CombinedCategory::Minimal,
    CombinedCategory::Low,
    CombinedCategory::Moderate,
    CombinedCategory::High,
    CombinedCategory::VeryHigh,
    CombinedCategory::Extreme,
    CombinedCategory::Critical,
    CombinedCategory::Emergency,
];

pub fn structural_ordinal(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::None => 0,
        RiskLevel::Low => 1,
        RiskLevel::Moderate | RiskLevel::ModerateHigh => 2,
        RiskLevel::High => 3,
        RiskLevel::Critical => 4,
    }
}

/// +2 per High alert, +1 per Moderate alert, capped. Unavailable counts as 0.
pub fn weather_ordinal(weather: &WeatherOutcome) -> u8 {
    // ---
    let WeatherOutcome::Available(report) = weather else {
        return 0;
    };

    let sum: u32 = report
        .alerts
        .iter()
        .map(|a| match a.severity {
            AlertSeverity::High => 2,
            AlertSeverity::Moderate => 1,
        })
        .sum();

    sum.min(WEATHER_ORDINAL_CAP as u32) as u8
}

/// Combine precomputed ordinals. `weather` is capped before summing.
pub fn combine_ordinals(structural: u8, weather: u8) -> CombinedRisk {
    // ---
    let weather = weather.min(WEATHER_ORDINAL_CAP);
    let last = (CATEGORIES.len() - 1) as u8;
    let total = structural.saturating_add(weather).min(last);

    let recommendation = match (structural >= 3, weather >= 2) {
        (true, true) => {
            "Evacuate the property until a structural engineer confirms it is safe; \
             severe weather is expected on a structurally compromised building"
        }
        (true, false) => "Request an urgent evaluation by a licensed structural engineer",
        (false, true) => {
            "Take weather precautions: secure loose objects, check drainage and follow \
             local advisories"
        }
        (false, false) => "Continue routine maintenance and periodic inspections",
    };

    CombinedRisk {
        structural_ordinal: structural,
        weather_ordinal: weather,
        total,
        category: CATEGORIES[total as usize],
        recommendation: recommendation.to_string(),
    }
}

pub fn combine(level: RiskLevel, weather: &WeatherOutcome) -> CombinedRisk {
    // ---
    let combined = combine_ordinals(structural_ordinal(level), weather_ordinal(weather));

    tracing::debug!(
        ?level,
        structural = combined.structural_ordinal,
        weather = combined.weather_ordinal,
        category = ?combined.category,
        "Combined risk computed"
    );

    combined
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{Alert, AlertKind, WeatherReport, WeatherSnapshot};
    use chrono::Utc;

    fn alert(severity: AlertSeverity) -> Alert {
        Alert {
            kind: AlertKind::Wind,
            description: "test".to_string(),
            severity,
            actions: vec![],
            timestamp: Utc::now(),
        }
    }

    fn available(severities: &[AlertSeverity]) -> WeatherOutcome {
        WeatherOutcome::Available(WeatherReport {
            latitude: 0.0,
            longitude: 0.0,
            conditions: WeatherSnapshot {
                temperature_c: 20.0,
                humidity: 50.0,
                wind_speed: 1.0,
                condition: "Clear".to_string(),
                description: String::new(),
                retrieved_at: Utc::now(),
            },
            alerts: severities.iter().copied().map(alert).collect(),
        })
    }

    #[test]
    fn test_weather_ordinal_is_capped() {
        // ---
        use AlertSeverity::*;
        assert_eq!(weather_ordinal(&available(&[])), 0);
        assert_eq!(weather_ordinal(&available(&[Moderate])), 1);
        assert_eq!(weather_ordinal(&available(&[High])), 2);
        assert_eq!(weather_ordinal(&available(&[High, Moderate])), 3);
        assert_eq!(weather_ordinal(&available(&[High, High, High])), 3);
    }

    #[test]
    fn test_unavailable_weather_contributes_nothing() {
        // ---
        let outcome = WeatherOutcome::Unavailable {
            reason: "timeout".to_string(),
        };
        let combined = combine(RiskLevel::High, &outcome);

        assert_eq!(combined.weather_ordinal, 0);
        assert_eq!(combined.total, 3);
        assert_eq!(combined.category, CombinedCategory::High);
        assert!(combined.recommendation.contains("urgent"));
    }

    #[test]
    fn test_total_formula_and_labels() {
        // ---
        for structural in 0..=4u8 {
            for weather in 0..=5u8 {
                let combined = combine_ordinals(structural, weather);
                let expected = (structural + weather.min(3)).min(7);
                assert_eq!(combined.total, expected);
                assert_eq!(combined.category, CATEGORIES[expected as usize]);
            }
        }
        assert_eq!(combine_ordinals(4, 3).category, CombinedCategory::Emergency);
        assert_eq!(combine_ordinals(0, 0).category, CombinedCategory::Minimal);
    }

    #[test]
    fn test_total_strictly_increases_per_component() {
        // ---
        for weather in 0..=3u8 {
            for structural in 0..4u8 {
                assert!(
                    combine_ordinals(structural + 1, weather).total
                        > combine_ordinals(structural, weather).total
                );
            }
        }
        for structural in 0..=4u8 {
            for weather in 0..3u8 {
                assert!(
                    combine_ordinals(structural, weather + 1).total
                        > combine_ordinals(structural, weather).total
                );
            }
        }
    }

    #[test]
    fn test_recommendation_selection() {
        // ---
        assert!(combine_ordinals(3, 2).recommendation.starts_with("Evacuate"));
        assert!(combine_ordinals(4, 1).recommendation.contains("urgent"));
        assert!(combine_ordinals(2, 2)
            .recommendation
            .starts_with("Take weather precautions"));
        assert!(combine_ordinals(2, 1)
            .recommendation
            .starts_with("Continue routine"));
    }

    #[test]
    fn test_structural_ordinals_are_monotonic() {
        // ---
        let levels = [
            RiskLevel::None,
            RiskLevel::Low,
            RiskLevel::Moderate,
            RiskLevel::ModerateHigh,
            RiskLevel::High,
            RiskLevel::Critical,
        ];
        for pair in levels.windows(2) {
            assert!(structural_ordinal(pair[0]) <= structural_ordinal(pair[1]));
        }
        assert_eq!(structural_ordinal(RiskLevel::Critical), 4);
        assert_eq!(structural_ordinal(RiskLevel::None), 0);
    }
}
