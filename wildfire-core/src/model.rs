use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aqi::AqiStatus;
use crate::geo::{Bounds, Coordinate};

/// FIRMS confidence is either a percentage (MODIS) or a label (VIIRS: "l", "n", "h").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Percent(f64),
    Label(String),
}

/// A normalized active-fire detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WildfireRecord {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub brightness: Option<f64>,
    pub confidence: Option<Confidence>,
    /// Fire radiative power, passed through only.
    pub frp: Option<f64>,
    pub acq_date: Option<String>,
    pub acq_time: Option<String>,
    pub daynight: Option<String>,
    pub source: String,
}

impl WildfireRecord {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Latest PM2.5 reading for one monitoring location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityStation {
    pub id: String,
    pub location: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// `None` when the concentration was missing or not a finite number.
    pub aqi: Option<i32>,
    pub status: AqiStatus,
    pub parameter: String,
    pub value: Option<f64>,
    pub unit: String,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Current wind at a point. `None` fields mean the signal is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindSnapshot {
    pub speed_value: Option<i64>,
    /// Meteorological bearing, 0-360.
    pub direction_degrees: Option<i32>,
    pub direction_cardinal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindForecastPoint {
    pub timestamp: String,
    pub speed_value: Option<i64>,
    pub direction_degrees: Option<i32>,
    pub direction_cardinal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPoint {
    pub grid_id: String,
    pub grid_x: i64,
    pub grid_y: i64,
}

/// Everything the wind provider knows about a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindReport {
    #[serde(flatten)]
    pub current: WindSnapshot,
    pub speed_unit: String,
    pub gust_value: Option<i64>,
    pub updated_at: String,
    pub office: String,
    pub grid: GridPoint,
    pub forecast: Vec<WindForecastPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmokeArea {
    pub latitude: f64,
    pub longitude: f64,
    /// µg/m³; missing upstream values read as 0.
    #[serde(default)]
    pub smoke_density: f64,
    pub visibility_km: Option<f64>,
    pub level: Option<String>,
}

/// One forecast hour. Sequences are ordered nearest hour first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmokeForecastHour {
    pub forecast_hour: u32,
    pub timestamp: DateTime<Utc>,
    pub areas: Vec<SmokeArea>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WildfireQuery {
    pub bounds: Option<Bounds>,
    pub days: u8,
    /// Overrides the configured FIRMS dataset, e.g. `MODIS_NRT`.
    pub dataset: Option<String>,
    /// Overrides the configured FIRMS area name.
    pub area: Option<String>,
}

impl Default for WildfireQuery {
    fn default() -> Self {
        Self { bounds: None, days: 1, dataset: None, area: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirQualityQuery {
    pub location: Coordinate,
    pub radius_meters: f64,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmokeQuery {
    pub bounds: Option<Bounds>,
    pub hours: u32,
}

impl Default for SmokeQuery {
    fn default() -> Self {
        Self { bounds: None, hours: 6 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertQuery {
    pub location: Coordinate,
    pub radius_meters: f64,
}
