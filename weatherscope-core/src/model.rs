use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A resolved geographic point with a human-readable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

impl Place {
    pub fn new(latitude: f64, longitude: f64, display_name: impl Into<String>) -> Self {
        Self { latitude, longitude, display_name: display_name.into() }
    }

    /// Place named after its own coordinates, used when no better name is known.
    pub fn at_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, format!("{latitude:.4}, {longitude:.4}"))
    }
}

/// One entry of the static city dataset.
///
/// Coordinates are kept as strings, the way the dataset ships them. Some
/// exports carry them as JSON numbers, which are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    pub city: String,
    #[serde(default)]
    pub city_ascii: String,
    #[serde(default)]
    pub admin_name: String,
    pub country: String,
    #[serde(deserialize_with = "string_or_number")]
    pub lat: String,
    #[serde(deserialize_with = "string_or_number")]
    pub lng: String,
}

impl CityRecord {
    /// Label shown for a selected city, e.g. "Mumbai, India".
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Current conditions as reported by the forecast API (Celsius, km/h).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub windspeed_kmh: f64,
    pub wind_direction_deg: f64,
    pub weather_code: i32,
    /// Local time at the forecast location.
    pub observed_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastEntry {
    pub date: NaiveDate,
    pub temp_max_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub weather_code: Option<i32>,
    pub windspeed_max_kmh: Option<f64>,
}

/// Normalized current + daily forecast data for one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: Option<CurrentConditions>,
    /// Chronological, in the order the API returned them.
    pub days: Vec<DailyForecastEntry>,
    pub timezone: String,
    /// Full decoded response body.
    pub raw: serde_json::Value,
}
