use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::WeatherError,
    model::{CurrentConditions, DailyForecastEntry, WeatherReport},
    provider::truncate_body,
};

use super::WeatherSource;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

const DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,weathercode,windspeed_10m_max";

/// Open-Meteo forecast client. Every call is a fresh round trip.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    http: Client,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self { base_url: base_url.into(), http }
    }

    async fn request_forecast(&self, latitude: f64, longitude: f64) -> Result<String, WeatherError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("latitude", latitude), ("longitude", longitude)])
            .query(&[
                ("current_weather", "true"),
                ("daily", DAILY_FIELDS),
                ("timezone", "auto"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn fetch_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReport, WeatherError> {
        let body = self.request_forecast(latitude, longitude).await?;
        let raw: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        let report = normalize(raw)?;
        tracing::debug!(latitude, longitude, days = report.days.len(), "Fetched forecast");
        Ok(report)
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature: f64,
    windspeed: f64,
    winddirection: f64,
    weathercode: i32,
    time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OmDaily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    weathercode: Vec<Option<i32>>,
    windspeed_10m_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current_weather: Option<OmCurrent>,
    daily: Option<OmDaily>,
    #[serde(default)]
    timezone: String,
}

/// Shape a decoded Open-Meteo body into a [`WeatherReport`].
///
/// Days follow the `time` array; any other daily array that runs short (or
/// holds null) leaves that field empty instead of failing.
pub(crate) fn normalize(raw: serde_json::Value) -> Result<WeatherReport, WeatherError> {
    let parsed = OmResponse::deserialize(&raw).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let current = parsed
        .current_weather
        .map(|c| -> Result<CurrentConditions, WeatherError> {
            Ok(CurrentConditions {
                temperature_c: c.temperature,
                windspeed_kmh: c.windspeed,
                wind_direction_deg: c.winddirection,
                weather_code: c.weathercode,
                observed_at: parse_local_time(&c.time)?,
            })
        })
        .transpose()?;

    let daily = parsed.daily.unwrap_or_default();
    let days = daily
        .time
        .iter()
        .enumerate()
        .map(|(i, date)| -> Result<DailyForecastEntry, WeatherError> {
            Ok(DailyForecastEntry {
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .map_err(|e| WeatherError::Parse(format!("bad daily date '{date}': {e}")))?,
                temp_max_c: at(&daily.temperature_2m_max, i),
                temp_min_c: at(&daily.temperature_2m_min, i),
                precipitation_mm: at(&daily.precipitation_sum, i),
                weather_code: at(&daily.weathercode, i),
                windspeed_max_kmh: at(&daily.windspeed_10m_max, i),
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    Ok(WeatherReport { current, days, timezone: parsed.timezone, raw })
}

fn at<T: Copy>(values: &[Option<T>], index: usize) -> Option<T> {
    values.get(index).copied().flatten()
}

// Open-Meteo sends local ISO-8601 without seconds ("2024-06-01T14:00").
fn parse_local_time(s: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| WeatherError::Parse(format!("bad observation time '{s}': {e}")))
}
