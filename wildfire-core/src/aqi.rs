//! EPA Air Quality Index for PM2.5.

use serde::{Deserialize, Serialize};

/// PM2.5 concentration bands (µg/m³) and the AQI range each maps onto.
///
/// The last band has no upper cap: concentrations above 500.4 keep its slope.
const PM25_BREAKPOINTS: [(f64, f64, f64, f64); 6] = [
    (0.0, 12.0, 0.0, 50.0),
    (12.1, 35.4, 51.0, 100.0),
    (35.5, 55.4, 101.0, 150.0),
    (55.5, 150.4, 151.0, 200.0),
    (150.5, 250.4, 201.0, 300.0),
    (250.5, 500.4, 301.0, 500.0),
];

/// Discrete air quality category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AqiStatus {
    Good,
    Moderate,
    Sensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    Unknown,
}

impl AqiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AqiStatus::Good => "good",
            AqiStatus::Moderate => "moderate",
            AqiStatus::Sensitive => "sensitive",
            AqiStatus::Unhealthy => "unhealthy",
            AqiStatus::VeryUnhealthy => "very-unhealthy",
            AqiStatus::Hazardous => "hazardous",
            AqiStatus::Unknown => "unknown",
        }
    }

    /// Severity rank, 0 (good) to 5 (hazardous). `Unknown` has no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            AqiStatus::Good => Some(0),
            AqiStatus::Moderate => Some(1),
            AqiStatus::Sensitive => Some(2),
            AqiStatus::Unhealthy => Some(3),
            AqiStatus::VeryUnhealthy => Some(4),
            AqiStatus::Hazardous => Some(5),
            AqiStatus::Unknown => None,
        }
    }
}

impl std::fmt::Display for AqiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a PM2.5 concentration into an AQI value.
///
/// Returns `None` for missing or non-finite input.
pub fn pm25_to_aqi(pm25: Option<f64>) -> Option<i32> {
    let c = pm25.filter(|v| v.is_finite())?;

    let (c_lo, c_hi, aqi_lo, aqi_hi) = PM25_BREAKPOINTS
        .iter()
        .copied()
        .find(|&(_, c_hi, _, _)| c <= c_hi)
        .unwrap_or(PM25_BREAKPOINTS[PM25_BREAKPOINTS.len() - 1]);

    let aqi = aqi_lo + (aqi_hi - aqi_lo) / (c_hi - c_lo) * (c - c_lo);
    Some(aqi.round() as i32)
}

/// Map an AQI value to its category. Total over all integers.
pub fn classify_aqi_status(aqi: Option<i32>) -> AqiStatus {
    match aqi {
        None => AqiStatus::Unknown,
        Some(v) if v <= 50 => AqiStatus::Good,
        Some(v) if v <= 100 => AqiStatus::Moderate,
        Some(v) if v <= 150 => AqiStatus::Sensitive,
        Some(v) if v <= 200 => AqiStatus::Unhealthy,
        Some(v) if v <= 300 => AqiStatus::VeryUnhealthy,
        Some(_) => AqiStatus::Hazardous,
    }
}
