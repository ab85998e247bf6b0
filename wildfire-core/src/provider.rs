use crate::{
    Config,
    error::Result,
    geo::{Bounds, Coordinate},
    model::{
        AirQualityQuery, AirQualityStation, SmokeForecastHour, SmokeQuery, WildfireQuery,
        WildfireRecord, WindReport,
    },
    provider::{
        firms::FirmsProvider, nws::NwsProvider, openaq::OpenAqProvider,
        smoke::SyntheticSmokeForecast,
    },
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod firms;
pub mod nws;
pub mod openaq;
pub mod smoke;

/// Upstream services that take credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Firms,
    OpenAq,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Firms => "firms",
            ProviderId::OpenAq => "openaq",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::Firms => "NASA_FIRMS_API_KEY",
            ProviderId::OpenAq => "OPENAQ_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Firms, ProviderId::OpenAq]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "firms" => Ok(ProviderId::Firms),
            "openaq" => Ok(ProviderId::OpenAq),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: firms, openaq."
            )),
        }
    }
}

#[async_trait]
pub trait WildfireSource: Send + Sync + Debug {
    async fn active_wildfires(&self, query: &WildfireQuery) -> Result<Vec<WildfireRecord>>;
}

#[async_trait]
pub trait AirQualitySource: Send + Sync + Debug {
    async fn stations_near(&self, query: &AirQualityQuery) -> Result<Vec<AirQualityStation>>;

    /// Stations around the centre of `bounds`.
    async fn stations_within(&self, bounds: &Bounds) -> Result<Vec<AirQualityStation>> {
        let query = AirQualityQuery {
            location: bounds.center(),
            radius_meters: bounds.approx_radius_meters(),
            limit: None,
        };
        self.stations_near(&query).await
    }
}

#[async_trait]
pub trait WindSource: Send + Sync + Debug {
    async fn wind_at(&self, location: Coordinate) -> Result<WindReport>;
}

#[async_trait]
pub trait SmokeForecastSource: Send + Sync + Debug {
    async fn smoke_forecast(&self, query: &SmokeQuery) -> Result<Vec<SmokeForecastHour>>;
}

/// One of each upstream source.
#[derive(Debug, Clone)]
pub struct Sources {
    pub wildfires: Arc<dyn WildfireSource>,
    pub air_quality: Arc<dyn AirQualitySource>,
    pub wind: Arc<dyn WindSource>,
    pub smoke: Arc<dyn SmokeForecastSource>,
}

impl Sources {
    /// Build the live sources. A missing FIRMS key only fails when fires are requested.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            wildfires: Arc::new(FirmsProvider::new(
                http.clone(),
                config.provider_api_key(ProviderId::Firms).map(str::to_owned),
                config.firms.clone(),
                config.cache.wildfires_ttl(),
            )),
            air_quality: Arc::new(OpenAqProvider::new(
                http.clone(),
                config.provider_api_key(ProviderId::OpenAq).map(str::to_owned),
                config.openaq.clone(),
                config.cache.air_quality_ttl(),
            )),
            wind: Arc::new(NwsProvider::new(http, config.cache.wind_ttl())),
            smoke: Arc::new(SyntheticSmokeForecast::new(config.cache.smoke_ttl())),
        })
    }
}
