//! NOAA National Weather Service gridpoint wind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    cache::TtlCache,
    error::{FetchError, Result, truncate_body},
    geo::{Coordinate, to_cardinal},
    model::{GridPoint, WindForecastPoint, WindReport, WindSnapshot},
};

use super::WindSource;

pub const NWS_BASE_URL: &str = "https://api.weather.gov";

const FORECAST_POINTS: usize = 6;

#[derive(Debug)]
pub struct NwsProvider {
    http: Client,
    base_url: String,
    cache: TtlCache<WindReport>,
}

impl NwsProvider {
    pub fn new(http: Client, cache_ttl: Duration) -> Self {
        Self { http, base_url: NWS_BASE_URL.to_string(), cache: TtlCache::new(cache_ttl) }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn cache_key(location: Coordinate) -> String {
        format!("wind:{}:{}", location.lat, location.lng)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let res = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                provider: "NOAA",
                status,
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl WindSource for NwsProvider {
    async fn wind_at(&self, location: Coordinate) -> Result<WindReport> {
        let key = Self::cache_key(location);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("wind cache hit for {key}");
            return Ok(cached);
        }

        let point: NwsFeature<NwsPointProps> =
            self.get_json(&format!("/points/{},{}", location.lat, location.lng)).await?;
        let grid = point.properties.grid_point().ok_or(FetchError::GridPointUnresolved {
            lat: location.lat,
            lng: location.lng,
        })?;
        debug!("resolved {key} to grid {}/{},{}", grid.grid_id, grid.grid_x, grid.grid_y);

        let gridpoint: NwsFeature<NwsGridProps> = self
            .get_json(&format!("/gridpoints/{}/{},{}", grid.grid_id, grid.grid_x, grid.grid_y))
            .await?;

        let report = build_report(&point.properties, grid, gridpoint.properties, Utc::now());
        self.cache.insert(key, report.clone()).await;
        Ok(report)
    }
}

#[derive(Debug, Deserialize)]
struct NwsFeature<T> {
    properties: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NwsPointProps {
    grid_id: Option<String>,
    grid_x: Option<i64>,
    grid_y: Option<i64>,
    cwa: Option<String>,
    forecast_office: Option<String>,
}

impl NwsPointProps {
    fn grid_point(&self) -> Option<GridPoint> {
        Some(GridPoint {
            grid_id: self.grid_id.clone()?,
            grid_x: self.grid_x?,
            grid_y: self.grid_y?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NwsValue {
    valid_time: Option<String>,
    value: Option<f64>,
}

impl NwsValue {
    fn start_time(&self) -> Option<String> {
        let start = self.valid_time.as_deref()?.split('/').next()?;
        (!start.is_empty()).then(|| start.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NwsLayer {
    uom: Option<String>,
    #[serde(default)]
    values: Vec<NwsValue>,
}

impl NwsLayer {
    fn first_valid(&self) -> Option<&NwsValue> {
        self.values.iter().find(|v| v.value.is_some())
    }

    fn unit(&self) -> &str {
        self.uom.as_deref().and_then(|u| u.rsplit(':').next()).unwrap_or("")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NwsGridProps {
    #[serde(default)]
    wind_speed: NwsLayer,
    #[serde(default)]
    wind_direction: NwsLayer,
    #[serde(default)]
    wind_gust: NwsLayer,
}

/// A speed rounded to whole units, mph when the source unit is known.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Speed {
    value: i64,
    unit: String,
}

pub(crate) fn normalize_speed(value: Option<f64>, unit: &str) -> Option<Speed> {
    let value = value.filter(|v| v.is_finite())?;
    let (mph, unit) = match unit {
        "km_h-1" => (value * 0.621371, "mph"),
        "m_s-1" => (value * 2.23694, "mph"),
        "" => (value, "mph"),
        other => (value, other),
    };
    Some(Speed { value: mph.round() as i64, unit: unit.to_string() })
}

fn round_direction(value: Option<f64>) -> Option<i32> {
    value.filter(|v| v.is_finite()).map(|v| v.round() as i32)
}

fn cardinal(direction: Option<i32>) -> Option<String> {
    direction.and_then(|d| to_cardinal(f64::from(d))).map(str::to_string)
}

pub(crate) fn build_report(
    point: &NwsPointProps,
    grid: GridPoint,
    props: NwsGridProps,
    now: DateTime<Utc>,
) -> WindReport {
    let speed_entry = props.wind_speed.first_valid();
    let speed_unit = props.wind_speed.unit();
    let speed = speed_entry.and_then(|e| normalize_speed(e.value, speed_unit));
    let gust = props
        .wind_gust
        .first_valid()
        .and_then(|e| normalize_speed(e.value, props.wind_gust.unit()));
    let direction = round_direction(props.wind_direction.first_valid().and_then(|e| e.value));

    let forecast = props
        .wind_speed
        .values
        .iter()
        .take(FORECAST_POINTS)
        .enumerate()
        .filter_map(|(i, speed_entry)| {
            let timestamp = speed_entry.start_time()?;
            let direction =
                round_direction(props.wind_direction.values.get(i).and_then(|d| d.value));
            Some(WindForecastPoint {
                timestamp,
                speed_value: normalize_speed(speed_entry.value, speed_unit).map(|s| s.value),
                direction_degrees: direction,
                direction_cardinal: cardinal(direction),
            })
        })
        .collect();

    let office = point
        .cwa
        .clone()
        .or_else(|| point.forecast_office.clone())
        .unwrap_or_else(|| grid.grid_id.clone());

    WindReport {
        current: WindSnapshot {
            speed_value: speed.as_ref().map(|s| s.value),
            direction_degrees: direction,
            direction_cardinal: cardinal(direction),
        },
        speed_unit: speed.map_or_else(|| "mph".to_string(), |s| s.unit),
        gust_value: gust.map(|g| g.value),
        updated_at: speed_entry.and_then(NwsValue::start_time).unwrap_or_else(|| now.to_rfc3339()),
        office,
        grid,
        forecast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn point() -> NwsPointProps {
        serde_json::from_value(json!({
            "gridId": "MTR",
            "gridX": 85,
            "gridY": 105,
            "cwa": "MTR",
            "forecastOffice": "https://api.weather.gov/offices/MTR"
        }))
        .unwrap()
    }

    fn grid_props() -> NwsGridProps {
        serde_json::from_value(json!({
            "windSpeed": {
                "uom": "wmoUnit:km_h-1",
                "values": [
                    { "validTime": "2025-08-01T12:00:00+00:00/PT1H", "value": null },
                    { "validTime": "2025-08-01T13:00:00+00:00/PT1H", "value": 16.668 },
                    { "validTime": "2025-08-01T14:00:00+00:00/PT2H", "value": 20.372 }
                ]
            },
            "windDirection": {
                "uom": "wmoUnit:degree_(angle)",
                "values": [
                    { "validTime": "2025-08-01T12:00:00+00:00/PT1H", "value": 271.4 },
                    { "validTime": "2025-08-01T13:00:00+00:00/PT1H", "value": 280.0 }
                ]
            },
            "windGust": {
                "uom": "wmoUnit:m_s-1",
                "values": [ { "validTime": "2025-08-01T12:00:00+00:00/PT3H", "value": 10.0 } ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn builds_report_from_gridpoint() {
        let p = point();
        let grid = p.grid_point().expect("grid resolves");
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 12, 30, 0).unwrap();
        let report = build_report(&p, grid, grid_props(), now);

        assert_eq!(report.current.speed_value, Some(10));
        assert_eq!(report.speed_unit, "mph");
        assert_eq!(report.current.direction_degrees, Some(271));
        assert_eq!(report.current.direction_cardinal.as_deref(), Some("W"));
        assert_eq!(report.gust_value, Some(22));
        assert_eq!(report.updated_at, "2025-08-01T13:00:00+00:00");
        assert_eq!(report.office, "MTR");
        assert_eq!(report.grid.grid_x, 85);

        assert_eq!(report.forecast.len(), 3);
        assert_eq!(report.forecast[0].speed_value, None);
        assert_eq!(report.forecast[1].direction_degrees, Some(280));
        assert_eq!(report.forecast[2].direction_degrees, None);
        assert_eq!(report.forecast[2].timestamp, "2025-08-01T14:00:00+00:00");
    }

    #[test]
    fn empty_gridpoint_leaves_wind_unknown() {
        let p = point();
        let grid = p.grid_point().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 12, 30, 0).unwrap();
        let report = build_report(&p, grid, NwsGridProps::default(), now);

        assert_eq!(report.current, WindSnapshot::default());
        assert_eq!(report.updated_at, now.to_rfc3339());
        assert!(report.forecast.is_empty());
    }

    #[test]
    fn unresolved_grid_point() {
        let p: NwsPointProps = serde_json::from_value(json!({ "gridId": "MTR" })).unwrap();
        assert!(p.grid_point().is_none());
    }

    #[test]
    fn speed_units() {
        assert_eq!(normalize_speed(Some(10.0), "m_s-1").unwrap().value, 22);
        assert_eq!(normalize_speed(Some(10.0), "km_h-1").unwrap().value, 6);
        let knots = normalize_speed(Some(10.4), "kt").unwrap();
        assert_eq!((knots.value, knots.unit.as_str()), (10, "kt"));
        assert_eq!(normalize_speed(None, "m_s-1"), None);
    }

    /// Nothing listens here, so any request fails at connect time.
    const CLOSED_PORT: &str = "http://127.0.0.1:9";

    #[tokio::test]
    async fn cached_report_is_served_without_a_request() {
        let provider = NwsProvider::new(Client::new(), Duration::from_secs(60))
            .with_base_url(CLOSED_PORT);
        let location = Coordinate::new(37.77, -122.42);
        let p = point();
        let cached = build_report(&p, p.grid_point().unwrap(), grid_props(), Utc::now());
        provider.cache.insert(NwsProvider::cache_key(location), cached.clone()).await;

        assert_eq!(provider.wind_at(location).await.unwrap(), cached);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_http_error() {
        let provider = NwsProvider::new(Client::new(), Duration::from_secs(60))
            .with_base_url(CLOSED_PORT);

        let err = provider.wind_at(Coordinate::new(37.77, -122.42)).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)), "got {err:?}");
        assert!(provider.cache.is_empty().await);
    }

    #[test]
    fn office_falls_back_to_grid_id() {
        let p: NwsPointProps =
            serde_json::from_value(json!({ "gridId": "LOX", "gridX": 1, "gridY": 2 })).unwrap();
        let grid = p.grid_point().unwrap();
        let report = build_report(&p, grid, NwsGridProps::default(), Utc::now());
        assert_eq!(report.office, "LOX");
    }
}
