//! Point <-> name resolution via Nominatim (OpenStreetMap).
//! Free, no API key, but a User-Agent is required by their usage policy.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{error::GeocodeError, model::Place};

use super::Geocoder;

pub const DEFAULT_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    reverse_url: String,
    search_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(reverse_url: impl Into<String>, search_url: impl Into<String>, http: Client) -> Self {
        Self { reverse_url: reverse_url.into(), search_url: search_url.into(), http }
    }
}

fn check_status(res: &reqwest::Response) -> Result<(), GeocodeError> {
    let status = res.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(GeocodeError::Upstream { status: status.as_u16() })
    }
}

// A 200 can still carry an HTML throttling page.
fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, GeocodeError> {
    serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let res = self
            .http
            .get(&self.reverse_url)
            .query(&[("format", "jsonv2")])
            .query(&[("lat", latitude), ("lon", longitude)])
            .send()
            .await?;
        check_status(&res)?;

        // Nominatim answers 200 with {"error": "..."} for points in the sea.
        let body: NominatimReverse = decode(&res.text().await?)?;
        body.display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(GeocodeError::LookupMiss)
    }

    async fn search(&self, query: &str) -> Result<Place, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::LookupMiss);
        }

        let res = self
            .http
            .get(&self.search_url)
            .query(&[("format", "jsonv2"), ("q", query), ("limit", "1")])
            .send()
            .await?;
        check_status(&res)?;

        let hits: Vec<NominatimPlace> = decode(&res.text().await?)?;
        let hit = hits.into_iter().next().ok_or(GeocodeError::LookupMiss)?;

        let (Ok(latitude), Ok(longitude)) = (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) else {
            tracing::debug!(lat = %hit.lat, lon = %hit.lon, "Geocode hit with unusable coordinates");
            return Err(GeocodeError::LookupMiss);
        };

        let place = match hit.display_name.filter(|n| !n.trim().is_empty()) {
            Some(name) => Place::new(latitude, longitude, name),
            None => Place::at_coordinates(latitude, longitude),
        };
        Ok(place)
    }
}
