//! Error types for forecast retrieval, geocoding and the city dataset.

use thiserror::Error;

/// Failures of a forecast fetch or of turning a selection into one.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Open-Meteo responded with {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to parse forecast response: {0}")]
    Parse(String),

    #[error("Invalid coordinates for {name}: '{lat}', '{lng}'")]
    InvalidCoordinates { name: String, lat: String, lng: String },
}

impl WeatherError {
    /// User-facing message kept in the app state after a failed fetch.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Could not reach the weather service. Check your connection.".to_string()
            }
            Self::Upstream { status, .. } => format!("Open-Meteo responded with {status}"),
            Self::Parse(_) => "The weather service sent an unexpected response.".to_string(),
            Self::InvalidCoordinates { name, .. } => {
                format!("No usable coordinates for {name}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Geocoding service responded with {status}")]
    Upstream { status: u16 },

    #[error("Unexpected geocoding response: {0}")]
    Parse(String),

    #[error("No matching place found")]
    LookupMiss,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to read city dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse city dataset: {0}")]
    Json(#[from] serde_json::Error),
}
