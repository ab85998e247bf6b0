//! Core library for the `wildfire` CLI.
//!
//! This crate defines:
//! - Geo-math and EPA AQI helpers
//! - The multi-factor smoke risk scorer and alert formatting
//! - Upstream providers (NASA FIRMS, OpenAQ, NOAA) behind async traits
//! - Configuration & credentials handling
//!
//! The scoring path (`geo`, `aqi`, `risk`, `alert`) is pure and never fails;
//! only the providers perform I/O.

pub mod alert;
pub mod aqi;
pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod model;
pub mod provider;
pub mod risk;
pub mod service;

pub use alert::{AlertMessage, AlertResult, Severity, format_alert_messages, format_recommendations};
pub use aqi::{AqiStatus, classify_aqi_status, pm25_to_aqi};
pub use config::{Config, ProviderConfig};
pub use error::FetchError;
pub use geo::{Bounds, Coordinate, bearing_degrees, distance_meters};
pub use model::{
    AirQualityQuery, AirQualityStation, AlertQuery, SmokeForecastHour, SmokeQuery, WildfireQuery,
    WildfireRecord, WindReport, WindSnapshot,
};
pub use provider::{ProviderId, Sources};
pub use risk::{NullAqiPolicy, RiskAnalysis, RiskInput, RiskLevel, RiskScorer, WindImpact, score_risk};
pub use service::AlertService;
