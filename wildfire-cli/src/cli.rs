use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Password;
use log::info;
use serde::Serialize;

use wildfire_core::{
    AirQualityQuery, AlertQuery, AlertService, Bounds, Config, Coordinate, ProviderId, RiskScorer,
    SmokeQuery, Sources, WildfireQuery,
    provider::{firms::MAX_DAYS, smoke::MAX_HOURS},
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wildfire", version, about = "Wildfire smoke risk alerts")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Args)]
pub struct Location {
    /// Latitude in decimal degrees.
    #[arg(long, value_parser = parse_lat, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees.
    #[arg(long, value_parser = parse_lng, allow_hyphen_values = true)]
    pub lng: f64,
}

impl Location {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name: "firms" or "openaq".
        provider: String,
    },

    /// Combined risk alert for a location.
    Alerts {
        #[command(flatten)]
        location: Location,

        /// Search radius in meters; defaults to the configured radius.
        #[arg(long, value_parser = parse_radius)]
        radius: Option<f64>,

        /// Print the raw JSON payload.
        #[arg(long)]
        json: bool,
    },

    /// Active fire detections from NASA FIRMS.
    Fires {
        /// Bounding box as minLng,minLat,maxLng,maxLat.
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Option<Bounds>,

        /// Days to look back.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=MAX_DAYS as i64))]
        days: u8,

        /// FIRMS dataset, e.g. VIIRS_SNPP_NRT or MODIS_NRT.
        #[arg(long)]
        source: Option<String>,

        /// FIRMS area name.
        #[arg(long)]
        area: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// PM2.5 stations around a point or inside a box.
    AirQuality {
        #[arg(long, value_parser = parse_lat, allow_hyphen_values = true, requires = "lng", required_unless_present = "bbox")]
        lat: Option<f64>,

        #[arg(long, value_parser = parse_lng, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,

        /// Search radius in meters.
        #[arg(long, default_value_t = 50_000.0, value_parser = parse_radius)]
        radius: f64,

        /// Maximum number of locations.
        #[arg(long)]
        limit: Option<u32>,

        /// Bounding box as minLng,minLat,maxLng,maxLat.
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true, conflicts_with_all = ["lat", "lng"])]
        bbox: Option<Bounds>,

        #[arg(long)]
        json: bool,
    },

    /// Current wind and short forecast from NOAA.
    Wind {
        #[command(flatten)]
        location: Location,

        #[arg(long)]
        json: bool,
    },

    /// Smoke dispersion forecast.
    Smoke {
        /// Bounding box as minLng,minLat,maxLng,maxLat.
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Option<Bounds>,

        /// Forecast hours ahead.
        #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(1..=MAX_HOURS as i64))]
        hours: u32,

        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider)?,
            Command::Alerts { location, radius, json } => {
                let (config, sources) = load_sources()?;
                let query = AlertQuery {
                    location: location.coordinate(),
                    radius_meters: radius.unwrap_or(config.default_radius_meters),
                };
                let service = AlertService::new(sources, RiskScorer::new(config.null_aqi));
                let result = service
                    .generate_alerts(&query)
                    .await
                    .context("Failed to generate alerts")?;
                emit(json, &result, output::print_alerts)?;
            }
            Command::Fires { bbox, days, source, area, json } => {
                let (_, sources) = load_sources()?;
                let query = WildfireQuery { bounds: bbox, days, dataset: source, area };
                let fires = sources
                    .wildfires
                    .active_wildfires(&query)
                    .await
                    .context("Failed to fetch wildfire data")?;
                emit(json, &fires, |f| output::print_fires(f))?;
            }
            Command::AirQuality { lat, lng, radius, limit, bbox, json } => {
                let (_, sources) = load_sources()?;
                let stations = match (bbox, lat, lng) {
                    (Some(bounds), _, _) => sources.air_quality.stations_within(&bounds).await,
                    (None, Some(lat), Some(lng)) => {
                        let query = AirQualityQuery {
                            location: Coordinate::new(lat, lng),
                            radius_meters: radius,
                            limit,
                        };
                        sources.air_quality.stations_near(&query).await
                    }
                    _ => anyhow::bail!(
                        "Either provide --lat/--lng for a radius search or --bbox for a bounds search"
                    ),
                }
                .context("Failed to fetch air quality data")?;
                emit(json, &stations, |s| output::print_stations(s))?;
            }
            Command::Wind { location, json } => {
                let (_, sources) = load_sources()?;
                let report = sources
                    .wind
                    .wind_at(location.coordinate())
                    .await
                    .context("Failed to fetch wind data")?;
                emit(json, &report, output::print_wind)?;
            }
            Command::Smoke { bbox, hours, json } => {
                let (_, sources) = load_sources()?;
                let forecast = sources
                    .smoke
                    .smoke_forecast(&SmokeQuery { bounds: bbox, hours })
                    .await
                    .context("Failed to fetch smoke forecast")?;
                emit(json, &forecast, |f| output::print_smoke(f))?;
            }
        }

        Ok(())
    }
}

/// Stored config with environment overrides, and the live sources built from it.
fn load_sources() -> anyhow::Result<(Config, Sources)> {
    let mut config = Config::load()?;
    config.apply_env();
    let sources = Sources::from_config(&config).context("Failed to build HTTP client")?;
    Ok((config, sources))
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let prompt = format!("API key for {id}:");
    let api_key = Password::new(&prompt)
        .without_confirmation()
        .with_help_message(match id {
            ProviderId::Firms => "Request a MAP_KEY at https://firms.modaps.eosdis.nasa.gov/api/",
            ProviderId::OpenAq => "Create a key at https://explore.openaq.org/register",
        })
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key.to_string());
    config.save()?;
    info!("stored {id} key in {}", Config::config_file_path()?.display());
    println!("Saved API key for {id}.");

    Ok(())
}

fn emit<T: Serialize + ?Sized>(json: bool, value: &T, human: impl Fn(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn parse_number(s: &str) -> Result<f64, String> {
    let v: f64 = s.trim().parse().map_err(|_| format!("'{s}' is not a number"))?;
    if v.is_finite() { Ok(v) } else { Err(format!("'{s}' is not a finite number")) }
}

fn parse_lat(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if (-90.0..=90.0).contains(&v) {
        Ok(v)
    } else {
        Err("latitude must be between -90 and 90".to_string())
    }
}

fn parse_lng(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if (-180.0..=180.0).contains(&v) {
        Ok(v)
    } else {
        Err("longitude must be between -180 and 180".to_string())
    }
}

fn parse_radius(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if v > 0.0 { Ok(v) } else { Err("radius must be a positive number of meters".to_string()) }
}

fn parse_bbox(s: &str) -> Result<Bounds, String> {
    const USAGE: &str = "bounding box must be in format: minLng,minLat,maxLng,maxLat";

    let coords = s.split(',').map(parse_number).collect::<Result<Vec<_>, _>>();
    match coords.as_deref() {
        Ok(&[min_lng, min_lat, max_lng, max_lat]) => {
            Ok(Bounds { min_lat, max_lat, min_lng, max_lng })
        }
        _ => Err(USAGE.to_string()),
    }
}
