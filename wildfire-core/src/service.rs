//! Fetch every input for a location, then score and format.

use chrono::Utc;
use log::debug;

use crate::{
    alert::AlertResult,
    error::Result,
    model::{AirQualityQuery, AlertQuery, SmokeQuery, WildfireQuery},
    provider::Sources,
    risk::{RiskInput, RiskScorer},
};

/// Hours of smoke forecast considered for alerts.
const ALERT_SMOKE_HOURS: u32 = 6;

#[derive(Debug, Clone)]
pub struct AlertService {
    sources: Sources,
    scorer: RiskScorer,
}

impl AlertService {
    pub fn new(sources: Sources, scorer: RiskScorer) -> Self {
        Self { sources, scorer }
    }

    /// Runs the four upstream lookups concurrently; any failure fails the whole request.
    pub async fn generate_alerts(&self, query: &AlertQuery) -> Result<AlertResult> {
        let fires_query = WildfireQuery::default();
        let aq_query = AirQualityQuery {
            location: query.location,
            radius_meters: query.radius_meters,
            limit: None,
        };
        let smoke_query = SmokeQuery { bounds: None, hours: ALERT_SMOKE_HOURS };

        let (wildfires, air_quality, smoke_forecast, wind) = tokio::try_join!(
            self.sources.wildfires.active_wildfires(&fires_query),
            self.sources.air_quality.stations_near(&aq_query),
            self.sources.smoke.smoke_forecast(&smoke_query),
            self.sources.wind.wind_at(query.location),
        )?;
        debug!(
            "alert inputs: {} fires, {} stations, {} smoke hours",
            wildfires.len(),
            air_quality.len(),
            smoke_forecast.len()
        );

        let analysis = self.scorer.score(&RiskInput {
            location: query.location,
            wildfires: &wildfires,
            air_quality: &air_quality,
            smoke_forecast: &smoke_forecast,
            wind: &wind.current,
            radius_meters: query.radius_meters,
        });
        debug!("risk score {} ({})", analysis.score, analysis.level);

        Ok(AlertResult::from_analysis(query.location, &analysis, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alert::Severity,
        error::FetchError,
        geo::Coordinate,
        model::{
            AirQualityStation, GridPoint, SmokeForecastHour, WildfireRecord, WindReport,
            WindSnapshot,
        },
        provider::{AirQualitySource, SmokeForecastSource, WildfireSource, WindSource},
        risk::{
            NullAqiPolicy, RiskLevel, WindImpact,
            tests::{HOME, fire, north_of_home, station},
        },
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Debug)]
    struct FixedFires(Vec<WildfireRecord>);

    #[async_trait]
    impl WildfireSource for FixedFires {
        async fn active_wildfires(&self, _: &WildfireQuery) -> Result<Vec<WildfireRecord>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct FixedAir(Vec<AirQualityStation>);

    #[async_trait]
    impl AirQualitySource for FixedAir {
        async fn stations_near(&self, _: &AirQualityQuery) -> Result<Vec<AirQualityStation>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct FixedWind(Option<i32>);

    #[async_trait]
    impl WindSource for FixedWind {
        async fn wind_at(&self, _: Coordinate) -> Result<WindReport> {
            Ok(WindReport {
                current: WindSnapshot { direction_degrees: self.0, ..WindSnapshot::default() },
                speed_unit: "mph".into(),
                gust_value: None,
                updated_at: "2025-08-01T12:00:00+00:00".into(),
                office: "TEST".into(),
                grid: GridPoint { grid_id: "TEST".into(), grid_x: 0, grid_y: 0 },
                forecast: Vec::new(),
            })
        }
    }

    #[derive(Debug)]
    struct NoSmoke;

    #[async_trait]
    impl SmokeForecastSource for NoSmoke {
        async fn smoke_forecast(&self, _: &SmokeQuery) -> Result<Vec<SmokeForecastHour>> {
            Ok(Vec::new())
        }
    }

    #[derive(Debug)]
    struct BrokenWind;

    #[async_trait]
    impl WindSource for BrokenWind {
        async fn wind_at(&self, location: Coordinate) -> Result<WindReport> {
            Err(FetchError::GridPointUnresolved { lat: location.lat, lng: location.lng })
        }
    }

    fn sources(
        fires: Vec<WildfireRecord>,
        air: Vec<AirQualityStation>,
        wind: Arc<dyn WindSource>,
    ) -> Sources {
        Sources {
            wildfires: Arc::new(FixedFires(fires)),
            air_quality: Arc::new(FixedAir(air)),
            wind,
            smoke: Arc::new(NoSmoke),
        }
    }

    fn query(radius_meters: f64) -> AlertQuery {
        AlertQuery { location: HOME, radius_meters }
    }

    #[tokio::test]
    async fn quiet_location_is_low_risk() {
        let service = AlertService::new(
            sources(Vec::new(), Vec::new(), Arc::new(FixedWind(None))),
            RiskScorer::default(),
        );

        let result = service.generate_alerts(&query(100_000.0)).await.unwrap();

        assert_eq!(result.risk_score, 0);
        assert_eq!(result.overall_risk_level, RiskLevel::Low);
        assert!(result.alerts.is_empty());
        assert_eq!(result.recommendations.len(), 3);
        assert_eq!(result.location, HOME);
    }

    #[tokio::test]
    async fn fire_upwind_with_bad_air_is_hazardous() {
        let service = AlertService::new(
            sources(
                vec![fire("a", north_of_home(5_000.0))],
                vec![station(Some(160))],
                Arc::new(FixedWind(Some(180))),
            ),
            RiskScorer::default(),
        );

        let result = service.generate_alerts(&query(10_000.0)).await.unwrap();

        assert_eq!(result.risk_score, 85);
        assert_eq!(result.overall_risk_level, RiskLevel::Hazardous);
        assert_eq!(result.risk_color, "red");
        assert_eq!(result.alerts.len(), 4);
        assert_eq!(result.alerts[3].severity, Severity::Danger);
        assert_eq!(result.recommendations.len(), 5);
        assert_eq!(result.details.nearby_fires, 1);
        assert_eq!(result.details.wind_impact, Some(WindImpact::High));
    }

    #[tokio::test]
    async fn scorer_policy_is_applied() {
        let air = vec![station(Some(160)), station(None)];
        let as_zero = AlertService::new(
            sources(Vec::new(), air.clone(), Arc::new(FixedWind(None))),
            RiskScorer::default(),
        );
        let exclude = AlertService::new(
            sources(Vec::new(), air, Arc::new(FixedWind(None))),
            RiskScorer::new(NullAqiPolicy::Exclude),
        );

        let q = query(10_000.0);
        assert_eq!(as_zero.generate_alerts(&q).await.unwrap().details.current_aqi, Some(80));
        assert_eq!(exclude.generate_alerts(&q).await.unwrap().details.current_aqi, Some(160));
    }

    #[tokio::test]
    async fn any_upstream_failure_fails_the_request() {
        let service = AlertService::new(
            sources(vec![fire("a", north_of_home(5_000.0))], Vec::new(), Arc::new(BrokenWind)),
            RiskScorer::default(),
        );

        let err = service.generate_alerts(&query(10_000.0)).await.unwrap_err();
        assert!(matches!(err, FetchError::GridPointUnresolved { .. }));
    }
}
