//! NASA FIRMS active-fire area API.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    cache::TtlCache,
    config::{FirmsFormat, FirmsSettings},
    error::{FetchError, Result, truncate_body},
    geo::{Bounds, Coordinate},
    model::{Confidence, WildfireQuery, WildfireRecord},
};

use super::WildfireSource;

pub const FIRMS_BASE_URL: &str = "https://firms.modaps.eosdis.nasa.gov/api";

/// Most days of history the area endpoint serves.
pub const MAX_DAYS: u8 = 10;

#[derive(Debug)]
pub struct FirmsProvider {
    http: Client,
    api_key: Option<String>,
    settings: FirmsSettings,
    base_url: String,
    cache: TtlCache<Vec<WildfireRecord>>,
}

impl FirmsProvider {
    pub fn new(
        http: Client,
        api_key: Option<String>,
        settings: FirmsSettings,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http,
            api_key,
            settings,
            base_url: FIRMS_BASE_URL.to_string(),
            cache: TtlCache::new(cache_ttl),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn cache_key(query: &WildfireQuery, dataset: &str, area: &str) -> String {
        let bounds = query.bounds.map_or_else(|| "world".to_string(), |b| b.to_string());
        format!("wildfires:{bounds}:{}:{dataset}:{area}", query.days)
    }

    async fn fetch(&self, api_key: &str, dataset: &str, area: &str, days: u8) -> Result<String> {
        let format = self.settings.format.as_str();
        let url = format!("{}/area/{format}/{api_key}/{dataset}/{area}/{days}", self.base_url);
        debug!("requesting FIRMS {format} for {dataset}/{area}, {days} day(s)");

        let res = self.http.get(&url).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                provider: "FIRMS",
                status,
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl WildfireSource for FirmsProvider {
    async fn active_wildfires(&self, query: &WildfireQuery) -> Result<Vec<WildfireRecord>> {
        if !(1..=MAX_DAYS).contains(&query.days) {
            return Err(FetchError::InvalidData(format!(
                "days must be between 1 and {MAX_DAYS}, got {}",
                query.days
            )));
        }

        let dataset = query.dataset.as_deref().unwrap_or(&self.settings.dataset);
        let area = query.area.as_deref().unwrap_or(&self.settings.area);

        let key = Self::cache_key(query, dataset, area);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("wildfire cache hit for {key}");
            return Ok(cached);
        }

        let api_key = self.api_key.as_deref().ok_or(FetchError::MissingApiKey("firms"))?;
        let body = self.fetch(api_key, dataset, area, query.days).await?;

        let raw = match self.settings.format {
            FirmsFormat::Csv => parse_csv(&body)?,
            FirmsFormat::Json => parse_json(&body)?,
        };
        let fires = normalize_fires(raw, dataset, query.bounds);
        debug!("FIRMS returned {} usable detections", fires.len());

        self.cache.insert(key, fires.clone()).await;
        Ok(fires)
    }
}

/// A FIRMS row before normalization, whichever format it came from.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct RawFire {
    lat: Option<f64>,
    lng: Option<f64>,
    id: Option<String>,
    name: Option<String>,
    brightness: Option<f64>,
    confidence: Option<Confidence>,
    frp: Option<f64>,
    acq_date: Option<String>,
    acq_time: Option<String>,
    daynight: Option<String>,
    source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumOrText {
    Num(f64),
    Text(String),
}

impl NumOrText {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumOrText::Num(v) => Some(*v),
            NumOrText::Text(s) => s.trim().parse().ok(),
        }
    }

    fn into_text(self) -> String {
        match self {
            NumOrText::Num(v) if v.fract() == 0.0 => format!("{}", v as i64),
            NumOrText::Num(v) => v.to_string(),
            NumOrText::Text(s) => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FirmsJsonRow {
    #[serde(alias = "lat", alias = "latitud")]
    latitude: Option<NumOrText>,
    #[serde(alias = "lon", alias = "longitud")]
    longitude: Option<NumOrText>,
    #[serde(alias = "fire_id", alias = "fid")]
    id: Option<NumOrText>,
    #[serde(alias = "location")]
    name: Option<String>,
    #[serde(alias = "bright_ti4")]
    brightness: Option<NumOrText>,
    #[serde(alias = "confidence_level")]
    confidence: Option<NumOrText>,
    frp: Option<NumOrText>,
    #[serde(alias = "acquired")]
    acq_date: Option<String>,
    acq_time: Option<NumOrText>,
    daynight: Option<String>,
    #[serde(alias = "source")]
    satellite: Option<String>,
}

impl From<FirmsJsonRow> for RawFire {
    fn from(row: FirmsJsonRow) -> Self {
        RawFire {
            lat: row.latitude.as_ref().and_then(NumOrText::as_f64),
            lng: row.longitude.as_ref().and_then(NumOrText::as_f64),
            id: row.id.map(NumOrText::into_text),
            name: row.name,
            brightness: row.brightness.as_ref().and_then(NumOrText::as_f64),
            confidence: row.confidence.map(|c| match c {
                NumOrText::Num(v) => Confidence::Percent(v),
                NumOrText::Text(s) => Confidence::Label(s),
            }),
            frp: row.frp.as_ref().and_then(NumOrText::as_f64),
            acq_date: row.acq_date,
            acq_time: row.acq_time.map(NumOrText::into_text),
            daynight: row.daynight,
            source: row.satellite,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FirmsFeature {
    attributes: Option<FirmsJsonRow>,
    properties: Option<FirmsJsonRow>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FirmsJsonPayload {
    Features { features: Vec<FirmsFeature> },
    Rows(Vec<Option<FirmsJsonRow>>),
    Other(serde_json::Value),
}

/// FIRMS CSV columns; every field is text so one bad cell only drops its row.
#[derive(Debug, Deserialize)]
struct FirmsCsvRow {
    latitude: Option<String>,
    longitude: Option<String>,
    #[serde(default, alias = "bright_ti4")]
    brightness: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    frp: Option<String>,
    #[serde(default)]
    acq_date: Option<String>,
    #[serde(default)]
    acq_time: Option<String>,
    #[serde(default)]
    satellite: Option<String>,
    #[serde(default)]
    daynight: Option<String>,
}

impl From<FirmsCsvRow> for RawFire {
    fn from(row: FirmsCsvRow) -> Self {
        let number = |s: &Option<String>| s.as_deref().and_then(|v| v.trim().parse::<f64>().ok());
        let text = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

        RawFire {
            lat: number(&row.latitude),
            lng: number(&row.longitude),
            id: None,
            name: None,
            brightness: number(&row.brightness),
            confidence: text(row.confidence).map(|c| match c.parse::<f64>() {
                Ok(v) => Confidence::Percent(v),
                Err(_) => Confidence::Label(c),
            }),
            frp: number(&row.frp),
            acq_date: text(row.acq_date),
            acq_time: text(row.acq_time),
            daynight: text(row.daynight),
            source: text(row.satellite),
        }
    }
}

/// Rows from either JSON shape; unrecognised payloads yield nothing.
/// Features without attributes keep their slot so ids stay positional.
pub(crate) fn parse_json(body: &str) -> Result<Vec<Option<RawFire>>> {
    let payload: FirmsJsonPayload = serde_json::from_str(body)?;

    let rows = match payload {
        FirmsJsonPayload::Features { features } => features
            .into_iter()
            .map(|f| f.attributes.or(f.properties).map(RawFire::from))
            .collect(),
        FirmsJsonPayload::Rows(rows) => rows.into_iter().map(|r| r.map(RawFire::from)).collect(),
        FirmsJsonPayload::Other(_) => Vec::new(),
    };

    Ok(rows)
}

pub(crate) fn parse_csv(body: &str) -> Result<Vec<Option<RawFire>>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes())
        .deserialize::<FirmsCsvRow>()
        .map(|row| Ok(Some(RawFire::from(row?))))
        .collect()
}

/// Drop rows without usable coordinates and fill defaults.
pub(crate) fn normalize_fires(
    rows: Vec<Option<RawFire>>,
    dataset: &str,
    bounds: Option<Bounds>,
) -> Vec<WildfireRecord> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, raw)| normalize_fire(raw?, index, dataset))
        .filter(|fire| bounds.is_none_or(|b| b.contains(fire.coordinate())))
        .collect()
}

fn normalize_fire(raw: RawFire, index: usize, dataset: &str) -> Option<WildfireRecord> {
    let lat = raw.lat.filter(|v| v.is_finite())?;
    let lng = raw.lng.filter(|v| v.is_finite())?;
    if !Coordinate::new(lat, lng).is_valid() {
        return None;
    }

    let name = raw
        .name
        .clone()
        .or_else(|| raw.acq_date.clone())
        .unwrap_or_else(|| format!("Fire {}", index + 1));

    Some(WildfireRecord {
        id: raw.id.unwrap_or_else(|| format!("fire-{index}")),
        lat,
        lng,
        name,
        brightness: raw.brightness,
        confidence: raw.confidence,
        frp: raw.frp,
        acq_date: raw.acq_date,
        acq_time: raw.acq_time,
        daynight: raw.daynight,
        source: raw.source.unwrap_or_else(|| dataset.to_string()),
    })
}
