//! User-facing messages and recommendations derived from a [`RiskAnalysis`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::risk::{RiskAnalysis, RiskLevel, WindImpact};

const PROTECTIVE: &[&str] = &[
    "Stay indoors and keep windows and doors closed",
    "Use air purifiers with HEPA filters if available",
    "Avoid strenuous outdoor activities",
    "Wear N95 masks if you must go outside",
    "Monitor local emergency alerts",
];

const CAUTIONARY: &[&str] = &[
    "Limit prolonged outdoor activities",
    "Close windows if smoke odor is detected",
    "Monitor air quality updates",
    "People with respiratory conditions should take precautions",
];

const ROUTINE: &[&str] = &[
    "Conditions are currently safe",
    "Continue to monitor air quality",
    "Have an emergency plan ready",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Alert,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl AlertMessage {
    fn new(severity: Severity, title: &str, message: impl Into<String>) -> Self {
        Self { severity, title: title.to_string(), message: message.into() }
    }
}

/// Messages for every condition that holds, in a fixed order:
/// nearby fires, poor air, wind toward the location, hazardous level.
///
/// An empty list means conditions are stable.
pub fn format_alert_messages(analysis: &RiskAnalysis) -> Vec<AlertMessage> {
    let mut messages = Vec::new();

    if analysis.nearby_fires > 0 {
        let n = analysis.nearby_fires;
        let (verb, noun) = if n == 1 { ("is", "wildfire") } else { ("are", "wildfires") };
        messages.push(AlertMessage::new(
            Severity::Warning,
            "Active Wildfire Nearby",
            format!("There {verb} {n} active {noun} within your area."),
        ));
    }

    if let Some(aqi) = analysis.current_aqi.filter(|&aqi| aqi > 100) {
        messages.push(AlertMessage::new(
            Severity::Alert,
            "Poor Air Quality",
            format!("Current Air Quality Index is {aqi}. Air quality is unhealthy."),
        ));
    }

    if analysis.wind_impact == Some(WindImpact::High) {
        messages.push(AlertMessage::new(
            Severity::Warning,
            "Wind Direction Alert",
            "Wind is blowing smoke from nearby fires toward your location.",
        ));
    }

    if analysis.level == RiskLevel::Hazardous {
        messages.push(AlertMessage::new(
            Severity::Danger,
            "Hazardous Conditions",
            "Air quality is expected to be hazardous. Take immediate protective action.",
        ));
    }

    messages
}

/// Fixed advice for a risk level.
pub fn format_recommendations(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::Hazardous | RiskLevel::Unhealthy => PROTECTIVE,
        RiskLevel::Moderate => CAUTIONARY,
        RiskLevel::Low => ROUTINE,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDetails {
    pub nearby_fires: u32,
    pub closest_fire_distance_meters: Option<f64>,
    #[serde(rename = "currentAQI")]
    pub current_aqi: Option<i32>,
    pub forecasted_smoke_density: Option<f64>,
    pub wind_impact: Option<WindImpact>,
}

/// Response payload for one alert request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResult {
    pub location: Coordinate,
    pub overall_risk_level: RiskLevel,
    pub risk_color: String,
    pub risk_score: u32,
    pub alerts: Vec<AlertMessage>,
    pub recommendations: Vec<String>,
    pub details: AlertDetails,
    pub timestamp: DateTime<Utc>,
}

impl AlertResult {
    pub fn from_analysis(
        location: Coordinate,
        analysis: &RiskAnalysis,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            location,
            overall_risk_level: analysis.level,
            risk_color: analysis.level.color().to_string(),
            risk_score: analysis.score,
            alerts: format_alert_messages(analysis),
            recommendations: format_recommendations(analysis.level)
                .iter()
                .map(|s| s.to_string())
                .collect(),
            details: AlertDetails {
                nearby_fires: analysis.nearby_fires,
                closest_fire_distance_meters: analysis.closest_fire_distance_meters,
                current_aqi: analysis.current_aqi,
                forecasted_smoke_density: analysis.forecasted_smoke_density,
                wind_impact: analysis.wind_impact,
            },
            timestamp,
        }
    }
}
