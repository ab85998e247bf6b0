//! Multi-factor risk scoring.
//!
//! Each factor adds a bounded, non-negative amount to an integer score:
//!
//! | factor            | contribution                         |
//! |-------------------|--------------------------------------|
//! | closest fire      | <10 km: 40, <50 km: 25, in radius: 10 |
//! | mean station AQI  | >150: 30, >100: 20, >50: 10          |
//! | last smoke hour   | max density >100: 20, >50: 10        |
//! | wind from fire    | within 45°: 15                       |
//!
//! The level is a pure function of the score.

use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, bearing_degrees, distance_meters};
use crate::model::{AirQualityStation, SmokeForecastHour, WildfireRecord, WindSnapshot};

const WIND_CONE_DEGREES: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    Unhealthy,
    Hazardous,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            70.. => RiskLevel::Hazardous,
            50.. => RiskLevel::Unhealthy,
            30.. => RiskLevel::Moderate,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::Unhealthy => "unhealthy",
            RiskLevel::Hazardous => "hazardous",
        }
    }

    /// Map display colour.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Low => "green",
            RiskLevel::Moderate => "yellow",
            RiskLevel::Unhealthy => "orange",
            RiskLevel::Hazardous => "red",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindImpact {
    High,
    Low,
}

/// How stations without an AQI value enter the mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullAqiPolicy {
    /// Missing readings count as AQI 0 and stay in the denominator.
    #[default]
    AsZero,
    /// Missing readings are left out; all-missing means no AQI factor.
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub score: u32,
    pub level: RiskLevel,
    pub nearby_fires: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest_fire_distance_meters: Option<f64>,
    #[serde(rename = "currentAQI", skip_serializing_if = "Option::is_none")]
    pub current_aqi: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecasted_smoke_density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_impact: Option<WindImpact>,
}

/// Inputs for one scoring pass. Every collection may be empty.
#[derive(Debug, Clone, Copy)]
pub struct RiskInput<'a> {
    pub location: Coordinate,
    pub wildfires: &'a [WildfireRecord],
    pub air_quality: &'a [AirQualityStation],
    pub smoke_forecast: &'a [SmokeForecastHour],
    pub wind: &'a WindSnapshot,
    pub radius_meters: f64,
}

/// Scorer with a configurable null-AQI policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer {
    pub null_aqi: NullAqiPolicy,
}

impl RiskScorer {
    pub fn new(null_aqi: NullAqiPolicy) -> Self {
        Self { null_aqi }
    }

    pub fn score(&self, input: &RiskInput<'_>) -> RiskAnalysis {
        let mut score = 0;

        let (nearby_fires, closest) = closest_fire(input);
        if let Some((_, distance)) = closest {
            score += fire_proximity_points(distance);
        }

        let mean_aqi = mean_aqi(input.air_quality, self.null_aqi);
        if let Some(avg) = mean_aqi {
            score += aqi_points(avg);
        }

        let smoke = forecasted_smoke(input.smoke_forecast);
        if let Some(density) = smoke {
            score += smoke_points(density);
        }

        let wind_impact = match (closest, input.wind.direction_degrees) {
            (Some((fire, _)), Some(direction)) => {
                let impact = wind_impact(fire.coordinate(), input.location, direction);
                if impact == WindImpact::High {
                    score += 15;
                }
                Some(impact)
            }
            _ => None,
        };

        RiskAnalysis {
            score,
            level: RiskLevel::from_score(score),
            nearby_fires,
            closest_fire_distance_meters: closest.map(|(_, d)| d),
            current_aqi: mean_aqi.map(|avg| avg.round() as i32),
            forecasted_smoke_density: smoke,
            wind_impact,
        }
    }
}

/// Score with the default policy (missing AQI counts as 0).
pub fn score_risk(input: &RiskInput<'_>) -> RiskAnalysis {
    RiskScorer::default().score(input)
}

/// Count of fires within the radius and the nearest one. Ties keep the earliest record.
/// A NaN distance or radius never counts as within.
fn closest_fire<'a>(input: &RiskInput<'a>) -> (u32, Option<(&'a WildfireRecord, f64)>) {
    let mut count = 0;
    let mut closest: Option<(&WildfireRecord, f64)> = None;

    let in_radius = input
        .wildfires
        .iter()
        .map(|fire| (fire, distance_meters(input.location, fire.coordinate())))
        .filter(|&(_, distance)| distance <= input.radius_meters);

    for (fire, distance) in in_radius {
        count += 1;
        if closest.is_none_or(|(_, best)| distance < best) {
            closest = Some((fire, distance));
        }
    }

    (count, closest)
}

fn fire_proximity_points(distance: f64) -> u32 {
    if distance < 10_000.0 {
        40
    } else if distance < 50_000.0 {
        25
    } else {
        10
    }
}

fn mean_aqi(stations: &[AirQualityStation], policy: NullAqiPolicy) -> Option<f64> {
    let (sum, count) = match policy {
        NullAqiPolicy::AsZero => (
            stations.iter().map(|s| f64::from(s.aqi.unwrap_or(0))).sum::<f64>(),
            stations.len(),
        ),
        NullAqiPolicy::Exclude => stations
            .iter()
            .filter_map(|s| s.aqi)
            .fold((0.0, 0), |(sum, n), aqi| (sum + f64::from(aqi), n + 1)),
    };

    (count > 0).then(|| sum / count as f64)
}

fn aqi_points(avg: f64) -> u32 {
    if avg > 150.0 {
        30
    } else if avg > 100.0 {
        20
    } else if avg > 50.0 {
        10
    } else {
        0
    }
}

/// Peak density in the furthest-out forecast hour.
fn forecasted_smoke(forecast: &[SmokeForecastHour]) -> Option<f64> {
    forecast
        .last()?
        .areas
        .iter()
        .map(|a| a.smoke_density)
        .filter(|d| d.is_finite())
        .reduce(f64::max)
}

fn smoke_points(density: f64) -> u32 {
    if density > 100.0 {
        20
    } else if density > 50.0 {
        10
    } else {
        0
    }
}

/// `High` when the wind direction lies within 45° of the fire-to-location bearing.
fn wind_impact(fire: Coordinate, location: Coordinate, direction_degrees: i32) -> WindImpact {
    let bearing = bearing_degrees(fire, location);
    let diff = (f64::from(direction_degrees) - bearing).abs();

    if diff < WIND_CONE_DEGREES || diff > 360.0 - WIND_CONE_DEGREES {
        WindImpact::High
    } else {
        WindImpact::Low
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::aqi::classify_aqi_status;
    use crate::model::SmokeArea;
    use chrono::{TimeZone, Utc};

    pub(crate) const HOME: Coordinate = Coordinate::new(37.0, -120.0);

    /// A point `meters` due north of `HOME`.
    pub(crate) fn north_of_home(meters: f64) -> Coordinate {
        let dlat = (meters / crate::geo::EARTH_RADIUS_M).to_degrees();
        Coordinate::new(HOME.lat + dlat, HOME.lng)
    }

    pub(crate) fn fire(id: &str, at: Coordinate) -> WildfireRecord {
        WildfireRecord {
            id: id.to_string(),
            lat: at.lat,
            lng: at.lng,
            name: format!("Fire {id}"),
            brightness: None,
            confidence: None,
            frp: None,
            acq_date: None,
            acq_time: None,
            daynight: None,
            source: "VIIRS_SNPP_NRT".to_string(),
        }
    }

    pub(crate) fn station(aqi: Option<i32>) -> AirQualityStation {
        AirQualityStation {
            id: "aq-1".to_string(),
            location: "Test Station".to_string(),
            city: None,
            country: None,
            lat: None,
            lng: None,
            aqi,
            status: classify_aqi_status(aqi),
            parameter: "pm25".to_string(),
            value: None,
            unit: "µg/m³".to_string(),
            last_updated: None,
        }
    }

    fn smoke_hour(hour: u32, densities: &[f64]) -> SmokeForecastHour {
        SmokeForecastHour {
            forecast_hour: hour,
            timestamp: Utc.with_ymd_and_hms(2025, 8, 1, hour, 0, 0).unwrap(),
            areas: densities
                .iter()
                .map(|&d| SmokeArea {
                    latitude: HOME.lat,
                    longitude: HOME.lng,
                    smoke_density: d,
                    visibility_km: None,
                    level: None,
                })
                .collect(),
        }
    }

    fn input<'a>(
        wildfires: &'a [WildfireRecord],
        air_quality: &'a [AirQualityStation],
        smoke_forecast: &'a [SmokeForecastHour],
        wind: &'a WindSnapshot,
        radius_meters: f64,
    ) -> RiskInput<'a> {
        RiskInput { location: HOME, wildfires, air_quality, smoke_forecast, wind, radius_meters }
    }

    fn wind_from(degrees: i32) -> WindSnapshot {
        WindSnapshot { direction_degrees: Some(degrees), ..WindSnapshot::default() }
    }

    #[test]
    fn empty_inputs_score_zero() {
        let wind = WindSnapshot::default();
        let analysis = score_risk(&input(&[], &[], &[], &wind, 100_000.0));

        assert_eq!(analysis.score, 0);
        assert_eq!(analysis.level, RiskLevel::Low);
        assert_eq!(analysis.nearby_fires, 0);
        assert_eq!(analysis.closest_fire_distance_meters, None);
        assert_eq!(analysis.current_aqi, None);
        assert_eq!(analysis.forecasted_smoke_density, None);
        assert_eq!(analysis.wind_impact, None);
    }

    #[test]
    fn close_fire_adds_forty() {
        let fires = [fire("a", north_of_home(5_000.0))];
        let wind = WindSnapshot::default();
        let analysis = score_risk(&input(&fires, &[], &[], &wind, 10_000.0));

        assert_eq!(analysis.score, 40);
        assert_eq!(analysis.level, RiskLevel::Moderate);
        assert_eq!(analysis.nearby_fires, 1);
        let d = analysis.closest_fire_distance_meters.unwrap();
        assert!((d - 5_000.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn fire_distance_tiers() {
        let wind = WindSnapshot::default();
        let mid = [fire("m", north_of_home(30_000.0))];
        let far = [fire("f", north_of_home(80_000.0))];

        assert_eq!(score_risk(&input(&mid, &[], &[], &wind, 100_000.0)).score, 25);
        assert_eq!(score_risk(&input(&far, &[], &[], &wind, 100_000.0)).score, 10);
    }

    #[test]
    fn fires_outside_radius_are_ignored() {
        let fires = [fire("out", north_of_home(20_000.0))];
        let wind = wind_from(180);
        let analysis = score_risk(&input(&fires, &[], &[], &wind, 10_000.0));

        assert_eq!(analysis.score, 0);
        assert_eq!(analysis.nearby_fires, 0);
        assert_eq!(analysis.wind_impact, None);
    }

    #[test]
    fn nan_radius_or_position_matches_nothing() {
        let fires = [fire("near", north_of_home(5_000.0)), fire("far", north_of_home(900_000.0))];
        let wind = wind_from(180);
        let analysis = score_risk(&input(&fires, &[], &[], &wind, f64::NAN));

        assert_eq!(analysis.nearby_fires, 0);
        assert_eq!(analysis.score, 0);
        assert_eq!(analysis.level, RiskLevel::Low);

        let lost = [fire("lost", Coordinate::new(f64::NAN, -120.0))];
        let analysis = score_risk(&input(&lost, &[], &[], &wind, 10_000.0));
        assert_eq!(analysis.nearby_fires, 0);
        assert_eq!(analysis.closest_fire_distance_meters, None);
    }

    #[test]
    fn closest_fire_wins_and_ties_keep_first() {
        let far = fire("far", north_of_home(40_000.0));
        let near_a = fire("near-a", north_of_home(8_000.0));
        let near_b = fire("near-b", north_of_home(8_000.0));
        let fires = [far, near_a, near_b];
        let wind = WindSnapshot::default();

        let analysis = score_risk(&input(&fires, &[], &[], &wind, 100_000.0));
        assert_eq!(analysis.nearby_fires, 3);
        assert_eq!(analysis.score, 40);

        let (_, closest) = closest_fire(&input(&fires, &[], &[], &wind, 100_000.0));
        assert_eq!(closest.map(|(f, _)| f.id.as_str()), Some("near-a"));
    }

    #[test]
    fn single_unhealthy_station_adds_thirty() {
        let stations = [station(Some(180))];
        let wind = WindSnapshot::default();
        let analysis = score_risk(&input(&[], &stations, &[], &wind, 100_000.0));

        assert_eq!(analysis.score, 30);
        assert_eq!(analysis.level, RiskLevel::Moderate);
        assert_eq!(analysis.current_aqi, Some(180));
    }

    #[test]
    fn aqi_tiers_use_unrounded_mean() {
        let wind = WindSnapshot::default();
        // mean 100.5 rounds to 101 but is also > 100
        let stations = [station(Some(100)), station(Some(101))];
        let analysis = score_risk(&input(&[], &stations, &[], &wind, 1.0));
        assert_eq!(analysis.score, 20);
        assert_eq!(analysis.current_aqi, Some(101));

        let moderate = [station(Some(60))];
        assert_eq!(score_risk(&input(&[], &moderate, &[], &wind, 1.0)).score, 10);

        let good = [station(Some(50))];
        assert_eq!(score_risk(&input(&[], &good, &[], &wind, 1.0)).score, 0);
    }

    #[test]
    fn missing_aqi_counts_as_zero_by_default() {
        let stations = [station(Some(160)), station(None)];
        let wind = WindSnapshot::default();
        let analysis = score_risk(&input(&[], &stations, &[], &wind, 1.0));

        assert_eq!(analysis.current_aqi, Some(80));
        assert_eq!(analysis.score, 10);
    }

    #[test]
    fn exclude_policy_drops_missing_aqi() {
        let stations = [station(Some(160)), station(None)];
        let wind = WindSnapshot::default();
        let scorer = RiskScorer::new(NullAqiPolicy::Exclude);

        let analysis = scorer.score(&input(&[], &stations, &[], &wind, 1.0));
        assert_eq!(analysis.current_aqi, Some(160));
        assert_eq!(analysis.score, 30);

        let all_missing = [station(None)];
        let analysis = scorer.score(&input(&[], &all_missing, &[], &wind, 1.0));
        assert_eq!(analysis.current_aqi, None);
        assert_eq!(analysis.score, 0);
    }

    #[test]
    fn smoke_uses_last_forecast_hour() {
        let forecast = [smoke_hour(1, &[500.0]), smoke_hour(2, &[40.0, 75.0])];
        let wind = WindSnapshot::default();
        let analysis = score_risk(&input(&[], &[], &forecast, &wind, 1.0));

        assert_eq!(analysis.forecasted_smoke_density, Some(75.0));
        assert_eq!(analysis.score, 10);

        let heavy = [smoke_hour(1, &[101.0])];
        assert_eq!(score_risk(&input(&[], &[], &heavy, &wind, 1.0)).score, 20);
    }

    #[test]
    fn smoke_hour_without_areas_contributes_nothing() {
        let forecast = [smoke_hour(1, &[])];
        let wind = WindSnapshot::default();
        let analysis = score_risk(&input(&[], &[], &forecast, &wind, 1.0));

        assert_eq!(analysis.forecasted_smoke_density, None);
        assert_eq!(analysis.score, 0);
    }

    #[test]
    fn wind_aligned_with_fire_bearing_is_high() {
        // fire due north: bearing fire -> home is 180
        let fires = [fire("a", north_of_home(5_000.0))];
        let wind = wind_from(180);
        let analysis = score_risk(&input(&fires, &[], &[], &wind, 10_000.0));

        assert_eq!(analysis.wind_impact, Some(WindImpact::High));
        assert_eq!(analysis.score, 55);
        assert_eq!(analysis.level, RiskLevel::Unhealthy);
    }

    #[test]
    fn wind_cone_wraps_around_north() {
        assert_eq!(wind_impact(HOME, north_of_home(5_000.0), 10), WindImpact::High);
        assert_eq!(wind_impact(HOME, north_of_home(5_000.0), 350), WindImpact::High);
        assert_eq!(wind_impact(HOME, north_of_home(5_000.0), 45), WindImpact::Low);
    }

    #[test]
    fn crosswind_is_low_without_points() {
        let fires = [fire("a", north_of_home(5_000.0))];
        let wind = wind_from(90);
        let analysis = score_risk(&input(&fires, &[], &[], &wind, 10_000.0));

        assert_eq!(analysis.wind_impact, Some(WindImpact::Low));
        assert_eq!(analysis.score, 40);
    }

    #[test]
    fn unknown_wind_direction_leaves_impact_unset() {
        let fires = [fire("a", north_of_home(5_000.0))];
        let wind = WindSnapshot { speed_value: Some(12), ..WindSnapshot::default() };
        let analysis = score_risk(&input(&fires, &[], &[], &wind, 10_000.0));

        assert_eq!(analysis.wind_impact, None);
    }

    #[test]
    fn combined_factors_reach_hazardous() {
        let fires = [fire("a", north_of_home(5_000.0))];
        let stations = [station(Some(160))];
        let wind = wind_from(180);
        let analysis = score_risk(&input(&fires, &stations, &[], &wind, 10_000.0));

        assert_eq!(analysis.score, 85);
        assert_eq!(analysis.level, RiskLevel::Hazardous);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(49), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(50), RiskLevel::Unhealthy);
        assert_eq!(RiskLevel::from_score(69), RiskLevel::Unhealthy);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::Hazardous);
        assert_eq!(RiskLevel::from_score(105), RiskLevel::Hazardous);
    }

    #[test]
    fn scoring_is_deterministic() {
        let fires = [fire("a", north_of_home(5_000.0)), fire("b", north_of_home(30_000.0))];
        let stations = [station(Some(120)), station(None)];
        let forecast = [smoke_hour(1, &[60.0]), smoke_hour(2, &[110.0])];
        let wind = wind_from(170);
        let i = input(&fires, &stations, &forecast, &wind, 50_000.0);

        let first = score_risk(&i);
        let second = score_risk(&i);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn analysis_serializes_with_camel_case_keys() {
        let stations = [station(Some(180))];
        let wind = WindSnapshot::default();
        let analysis = score_risk(&input(&[], &stations, &[], &wind, 1.0));
        let json = serde_json::to_value(&analysis).unwrap();

        assert_eq!(json["currentAQI"], 180);
        assert_eq!(json["level"], "moderate");
        assert!(json.get("windImpact").is_none());
    }
}
