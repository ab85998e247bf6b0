use thiserror::Error;

/// Failures talking to an upstream data source.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("{provider} request failed with status {status}: {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(
        "No API key configured for {0}.\nHint: run `wildfire configure {0}` or set the matching environment variable."
    )]
    MissingApiKey(&'static str),

    #[error("Unable to resolve NOAA grid point for lat={lat}, lng={lng}")]
    GridPointUnresolved { lat: f64, lng: f64 },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Keep error bodies short enough to print.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
