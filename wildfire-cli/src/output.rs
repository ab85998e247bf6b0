//! Human-readable rendering of core results.

use chrono::{DateTime, Local, Utc};

use wildfire_core::{
    AirQualityStation, AlertResult, SmokeForecastHour, WildfireRecord, WindReport,
    alert::Severity,
    geo::{meters_to_km, meters_to_miles},
    model::Confidence,
    risk::WindImpact,
};

pub fn print_alerts(result: &AlertResult) {
    println!(
        "Risk at {:.4}, {:.4}: {} (score {}/100)",
        result.location.lat,
        result.location.lng,
        result.overall_risk_level.as_str().to_uppercase(),
        result.risk_score
    );
    println!("As of {}", local_time(result.timestamp));
    println!();

    if result.alerts.is_empty() {
        println!("No active alerts. Conditions are stable.");
    } else {
        for alert in &result.alerts {
            println!("{} {}", severity_tag(alert.severity), alert.title);
            println!("    {}", alert.message);
        }
    }

    let d = &result.details;
    println!();
    println!("Nearby fires:    {}", d.nearby_fires);
    if let Some(m) = d.closest_fire_distance_meters {
        println!("Closest fire:    {}", distance_label(m));
    }
    println!("Current AQI:     {}", d.current_aqi.map_or_else(|| "n/a".to_string(), |a| a.to_string()));
    if let Some(density) = d.forecasted_smoke_density {
        println!("Smoke forecast:  {density:.1} µg/m³");
    }
    if let Some(impact) = d.wind_impact {
        let label = match impact {
            WindImpact::High => "toward you",
            WindImpact::Low => "away from you",
        };
        println!("Wind:            {label}");
    }

    println!();
    println!("Recommendations:");
    for rec in &result.recommendations {
        println!("  - {rec}");
    }
}

pub fn print_fires(fires: &[WildfireRecord]) {
    if fires.is_empty() {
        println!("No active fires detected.");
        return;
    }

    println!("{} active fire detection(s)", fires.len());
    for fire in fires {
        let when = match (&fire.acq_date, &fire.acq_time) {
            (Some(date), Some(time)) => format!("{date} {time}"),
            (Some(date), None) => date.clone(),
            _ => "unknown time".to_string(),
        };
        println!(
            "  {:>9.4} {:>10.4}  {:<12} conf {:<6} {}",
            fire.lat,
            fire.lng,
            fire.source,
            confidence_label(fire.confidence.as_ref()),
            when
        );
    }
}

pub fn print_stations(stations: &[AirQualityStation]) {
    if stations.is_empty() {
        println!("No PM2.5 stations found.");
        return;
    }

    for s in stations {
        let aqi = s.aqi.map_or_else(|| "-".to_string(), |a| a.to_string());
        let reading = s.value.map_or_else(|| "-".to_string(), |v| format!("{v:.1} {}", s.unit));
        let place = match (&s.city, &s.country) {
            (Some(city), Some(country)) => format!("{}, {city} {country}", s.location),
            (None, Some(country)) => format!("{} {country}", s.location),
            _ => s.location.clone(),
        };
        println!("  AQI {aqi:>3}  {:<32} {:<14} {place}", s.status.to_string(), reading);
        if let Some(updated) = s.last_updated {
            println!("           updated {}", local_time(updated));
        }
    }
}

pub fn print_wind(report: &WindReport) {
    let speed = report
        .current
        .speed_value
        .map_or_else(|| "calm/unknown".to_string(), |v| format!("{v} {}", report.speed_unit));
    let direction = direction_label(
        report.current.direction_degrees,
        report.current.direction_cardinal.as_deref(),
    );

    println!("Wind {speed} from {direction}");
    if let Some(gust) = report.gust_value {
        println!("Gusts to {gust} {}", report.speed_unit);
    }
    println!(
        "Office {} (grid {}/{},{}), updated {}",
        report.office, report.grid.grid_id, report.grid.grid_x, report.grid.grid_y, report.updated_at
    );

    if !report.forecast.is_empty() {
        println!();
        for point in &report.forecast {
            let speed = point.speed_value.map_or_else(|| "-".to_string(), |v| v.to_string());
            println!(
                "  {}  {speed:>3} {}  {}",
                point.timestamp,
                report.speed_unit,
                direction_label(point.direction_degrees, point.direction_cardinal.as_deref())
            );
        }
    }
}

pub fn print_smoke(forecast: &[SmokeForecastHour]) {
    if forecast.is_empty() {
        println!("No smoke forecast available.");
        return;
    }

    for hour in forecast {
        println!("+{}h  {}", hour.forecast_hour, local_time(hour.timestamp));
        for area in &hour.areas {
            let visibility =
                area.visibility_km.map_or_else(|| "-".to_string(), |v| format!("{v:.1} km"));
            println!(
                "    {:>8.3} {:>9.3}  {:>6.1} µg/m³  vis {visibility:<8} {}",
                area.latitude,
                area.longitude,
                area.smoke_density,
                area.level.as_deref().unwrap_or("")
            );
        }
    }
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning => "[WARNING]",
        Severity::Alert => "[ALERT]",
        Severity::Danger => "[DANGER]",
    }
}

fn distance_label(meters: f64) -> String {
    format!("{:.1} km ({:.1} mi)", meters_to_km(meters), meters_to_miles(meters))
}

fn confidence_label(confidence: Option<&Confidence>) -> String {
    match confidence {
        Some(Confidence::Percent(p)) => format!("{p:.0}%"),
        Some(Confidence::Label(l)) => l.clone(),
        None => "-".to_string(),
    }
}

fn direction_label(degrees: Option<i32>, cardinal: Option<&str>) -> String {
    match (degrees, cardinal) {
        (Some(d), Some(c)) => format!("{c} ({d}°)"),
        (Some(d), None) => format!("{d}°"),
        _ => "unknown".to_string(),
    }
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M %Z").to_string()
}
