//! Smoke dispersion forecast.
//!
//! HRRR-Smoke publishes GRIB2 fields that nothing here decodes yet, so this
//! source produces a fixed two-area plume that thickens hour by hour. It keeps
//! the forecast shape and ordering the scorer relies on.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::debug;
use std::time::Duration;

use crate::{
    cache::TtlCache,
    error::{FetchError, Result},
    model::{SmokeArea, SmokeForecastHour, SmokeQuery},
};

use super::SmokeForecastSource;

pub const MAX_HOURS: u32 = 48;

/// Hours actually generated, whatever the request.
const GENERATED_HOURS: u32 = 6;

#[derive(Debug)]
pub struct SyntheticSmokeForecast {
    cache: TtlCache<Vec<SmokeForecastHour>>,
}

impl SyntheticSmokeForecast {
    pub fn new(cache_ttl: Duration) -> Self {
        Self { cache: TtlCache::new(cache_ttl) }
    }

    fn cache_key(query: &SmokeQuery) -> String {
        let bounds = query.bounds.map_or_else(|| "default".to_string(), |b| b.to_string());
        format!("smoke:{bounds}:{}", query.hours)
    }
}

#[async_trait]
impl SmokeForecastSource for SyntheticSmokeForecast {
    async fn smoke_forecast(&self, query: &SmokeQuery) -> Result<Vec<SmokeForecastHour>> {
        if !(1..=MAX_HOURS).contains(&query.hours) {
            return Err(FetchError::InvalidData(format!(
                "hours must be between 1 and {MAX_HOURS}, got {}",
                query.hours
            )));
        }

        let key = Self::cache_key(query);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("smoke cache hit for {key}");
            return Ok(cached);
        }

        let forecast = synthetic_forecast(Utc::now(), query.hours);
        self.cache.insert(key, forecast.clone()).await;
        Ok(forecast)
    }
}

pub(crate) fn synthetic_forecast(now: DateTime<Utc>, hours: u32) -> Vec<SmokeForecastHour> {
    (1..=hours.min(GENERATED_HOURS))
        .map(|hour| {
            let h = f64::from(hour);
            SmokeForecastHour {
                forecast_hour: hour,
                timestamp: now + ChronoDuration::hours(i64::from(hour)),
                areas: vec![
                    SmokeArea {
                        latitude: 37.8,
                        longitude: -122.4,
                        smoke_density: 45.0 + h * 5.0,
                        visibility_km: Some(8.0 - h * 0.5),
                        level: Some("moderate".to_string()),
                    },
                    SmokeArea {
                        latitude: 38.0,
                        longitude: -122.2,
                        smoke_density: 85.0 + h * 10.0,
                        visibility_km: Some(5.0 - h * 0.3),
                        level: Some("unhealthy".to_string()),
                    },
                ],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generates_at_most_six_hours() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();

        assert_eq!(synthetic_forecast(now, 3).len(), 3);

        let full = synthetic_forecast(now, 24);
        assert_eq!(full.len(), 6);
        assert_eq!(full[0].forecast_hour, 1);
        assert_eq!(full[5].timestamp, now + ChronoDuration::hours(6));
        assert_eq!(full[5].areas[1].smoke_density, 145.0);
        assert_eq!(full[0].areas[0].smoke_density, 50.0);
    }

    #[tokio::test]
    async fn rejects_out_of_range_hours() {
        let source = SyntheticSmokeForecast::new(Duration::from_secs(60));
        let err = source.smoke_forecast(&SmokeQuery { bounds: None, hours: 0 }).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidData(_)));
    }

    #[tokio::test]
    async fn repeated_queries_hit_cache() {
        let source = SyntheticSmokeForecast::new(Duration::from_secs(60));
        let first = source.smoke_forecast(&SmokeQuery::default()).await.unwrap();
        let second = source.smoke_forecast(&SmokeQuery::default()).await.unwrap();
        assert_eq!(first, second);
    }
}
