//! OpenAQ v3 PM2.5 readings near a point.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use crate::{
    aqi::{classify_aqi_status, pm25_to_aqi},
    cache::TtlCache,
    config::OpenAqSettings,
    error::{FetchError, Result, truncate_body},
    model::{AirQualityQuery, AirQualityStation},
};

use super::AirQualitySource;

pub const OPENAQ_BASE_URL: &str = "https://api.openaq.org/v3";

/// OpenAQ parameter id for PM2.5.
const PM25_ID: i64 = 2;

/// OpenAQ rejects radius searches beyond 25 km.
const MAX_RADIUS_M: f64 = 25_000.0;

const MAX_LIMIT: u32 = 100;

#[derive(Debug)]
pub struct OpenAqProvider {
    http: Client,
    api_key: Option<String>,
    settings: OpenAqSettings,
    base_url: String,
    cache: TtlCache<Vec<AirQualityStation>>,
}

impl OpenAqProvider {
    pub fn new(
        http: Client,
        api_key: Option<String>,
        settings: OpenAqSettings,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http,
            api_key,
            settings,
            base_url: OPENAQ_BASE_URL.to_string(),
            cache: TtlCache::new(cache_ttl),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn cache_key(query: &AirQualityQuery, limit: u32) -> String {
        format!(
            "aq:{}:{}:{}:{limit}",
            query.location.lat, query.location.lng, query.radius_meters
        )
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let req = self.http.get(format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => req.header("X-API-Key", key),
            None => req,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, req: RequestBuilder) -> Result<T> {
        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                provider: "OpenAQ",
                status,
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn locations(&self, query: &AirQualityQuery, limit: u32) -> Result<Vec<OaqLocation>> {
        let coordinates = format!("{},{}", query.location.lat, query.location.lng);
        let radius = clamp_radius(query.radius_meters);

        let req = self.get("/locations").query(&[
            ("coordinates", coordinates),
            ("radius", radius.to_string()),
            ("parameters_id", PM25_ID.to_string()),
            ("limit", limit.to_string()),
        ]);

        let page: OaqPage<OaqLocation> = self.send(req).await?;
        Ok(page.results)
    }

    async fn latest(&self, location_id: i64, since: DateTime<Utc>) -> Result<Vec<OaqLatest>> {
        let req = self
            .get(&format!("/locations/{location_id}/latest"))
            .query(&[("limit", "100".to_string()), ("datetime_min", since.to_rfc3339())]);

        let page: OaqPage<OaqLatest> = self.send(req).await?;
        Ok(page.results)
    }
}

#[async_trait]
impl AirQualitySource for OpenAqProvider {
    async fn stations_near(&self, query: &AirQualityQuery) -> Result<Vec<AirQualityStation>> {
        let limit = query.limit.unwrap_or(self.settings.limit).clamp(1, MAX_LIMIT);

        let key = Self::cache_key(query, limit);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("air quality cache hit for {key}");
            return Ok(cached);
        }

        let locations = self.locations(query, limit).await?;
        if locations.is_empty() {
            self.cache.insert(key, Vec::new()).await;
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let since = now - ChronoDuration::hours(i64::from(self.settings.max_age_hours));

        // A failing location only loses its own readings.
        let latest = join_all(locations.iter().map(|loc| async move {
            self.latest(loc.id, since).await.unwrap_or_else(|e| {
                warn!("OpenAQ latest failed for location {}: {e}", loc.id);
                Vec::new()
            })
        }))
        .await;

        let readings = latest.into_iter().flatten().collect();
        let stations = build_stations(&locations, readings, now, self.settings.max_age_hours);
        debug!("OpenAQ produced {} stations from {} locations", stations.len(), locations.len());

        self.cache.insert(key, stations.clone()).await;
        Ok(stations)
    }
}

pub(crate) fn clamp_radius(radius_meters: f64) -> u32 {
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return 10_000;
    }
    radius_meters.clamp(1.0, MAX_RADIUS_M).round() as u32
}

#[derive(Debug, Deserialize)]
struct OaqPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct OaqCoordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OaqParameter {
    id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OaqSensor {
    id: i64,
    parameter: Option<OaqParameter>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OaqCountry {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OaqLocation {
    id: i64,
    name: Option<String>,
    locality: Option<String>,
    country: Option<OaqCountry>,
    coordinates: Option<OaqCoordinates>,
    #[serde(default)]
    sensors: Vec<OaqSensor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OaqDatetime {
    utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OaqLatest {
    datetime: Option<OaqDatetime>,
    value: Option<f64>,
    coordinates: Option<OaqCoordinates>,
    sensors_id: i64,
    locations_id: i64,
}

impl OaqLatest {
    fn utc(&self) -> Option<DateTime<Utc>> {
        self.datetime.as_ref().and_then(|d| d.utc)
    }
}

/// Keep recent PM2.5 readings, newest per location, in first-seen location order.
pub(crate) fn build_stations(
    locations: &[OaqLocation],
    readings: Vec<OaqLatest>,
    now: DateTime<Utc>,
    max_age_hours: u32,
) -> Vec<AirQualityStation> {
    let max_age = ChronoDuration::hours(i64::from(max_age_hours));
    let by_id: HashMap<i64, &OaqLocation> = locations.iter().map(|l| (l.id, l)).collect();
    let pm25_sensors: HashSet<i64> = locations
        .iter()
        .flat_map(|l| &l.sensors)
        .filter(|s| s.parameter.as_ref().is_some_and(|p| p.id == PM25_ID))
        .map(|s| s.id)
        .collect();

    let mut order: Vec<i64> = Vec::new();
    let mut newest: HashMap<i64, OaqLatest> = HashMap::new();

    for reading in readings {
        if !pm25_sensors.contains(&reading.sensors_id) {
            continue;
        }
        let Some(ts) = reading.utc() else { continue };
        if now - ts > max_age {
            continue;
        }

        let location_id = reading.locations_id;
        if !newest.contains_key(&location_id) {
            order.push(location_id);
        }
        if newest.get(&location_id).and_then(OaqLatest::utc).is_none_or(|prev| ts > prev) {
            newest.insert(location_id, reading);
        }
    }

    order
        .into_iter()
        .enumerate()
        .filter_map(|(i, location_id)| {
            let r = newest.remove(&location_id)?;
            let loc = by_id.get(&location_id).copied();
            let loc_coords = loc.and_then(|l| l.coordinates);
            let aqi = pm25_to_aqi(r.value);

            Some(AirQualityStation {
                id: format!("aq-{}-{i}", r.sensors_id),
                location: loc
                    .and_then(|l| l.name.clone())
                    .unwrap_or_else(|| format!("Location {location_id}")),
                city: loc.and_then(|l| l.locality.clone()),
                country: loc.and_then(|l| l.country.as_ref()).and_then(|c| c.code.clone()),
                lat: r.coordinates.and_then(|c| c.latitude).or(loc_coords.and_then(|c| c.latitude)),
                lng: r
                    .coordinates
                    .and_then(|c| c.longitude)
                    .or(loc_coords.and_then(|c| c.longitude)),
                aqi,
                status: classify_aqi_status(aqi),
                parameter: "pm25".to_string(),
                value: r.value,
                unit: "µg/m³".to_string(),
                last_updated: r.utc(),
            })
        })
        .collect()
}
