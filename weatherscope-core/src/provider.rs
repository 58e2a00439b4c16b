use crate::{
    Config,
    error::{GeocodeError, WeatherError},
    model::{Place, WeatherReport},
    provider::{nominatim::NominatimGeocoder, openmeteo::OpenMeteoClient},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod nominatim;
pub mod openmeteo;

/// Anything that can produce a normalized report for a coordinate pair.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReport, WeatherError>;
}

/// Point <-> name resolution used by the map surface.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Display name for a point.
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError>;

    /// Best match for a free-text place query.
    async fn search(&self, query: &str) -> Result<Place, GeocodeError>;
}

/// HTTP-backed sources wired from configuration.
#[derive(Debug, Clone)]
pub struct Services {
    pub weather: Arc<dyn WeatherSource>,
    pub geocoder: Arc<dyn Geocoder>,
}

/// Build the forecast client and geocoder from config, sharing one HTTP client.
pub fn services_from_config(config: &Config) -> anyhow::Result<Services> {
    let http = config.http_client()?;
    let endpoints = &config.endpoints;

    let weather = OpenMeteoClient::new(endpoints.forecast_url.clone(), http.clone());
    let geocoder = NominatimGeocoder::new(
        endpoints.reverse_geocode_url.clone(),
        endpoints.search_url.clone(),
        http,
    );

    Ok(Services { weather: Arc::new(weather), geocoder: Arc::new(geocoder) })
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
