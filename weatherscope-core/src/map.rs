//! Map interaction surface.
//!
//! The map widget itself sits behind [`MapView`]; the surface turns its two
//! gestures (a click, or a query in the map's own search box) into a
//! [`Place`] and hands it to whoever implements [`PlacePicked`], normally the
//! [`Coordinator`]. Weather is never fetched here, so a failed fetch shows up
//! in the coordinator state exactly like one started from the search box.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    coordinator::{Coordinator, FetchOutcome},
    error::GeocodeError,
    model::{Place, WeatherReport},
    provider::Geocoder,
    weathercode,
};

/// Zoom used when flying to a geocode search hit.
pub const SEARCH_ZOOM: u8 = 12;

/// Base tile layer the view renders under the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub url_template: &'static str,
    pub attribution: &'static str,
    pub max_zoom: u8,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            attribution: "© OpenStreetMap contributors",
            max_zoom: 19,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

/// Initial view: the Indian subcontinent.
pub const INITIAL_VIEW: Viewport = Viewport { latitude: 20.5937, longitude: 78.9629, zoom: 5 };

/// The single selection pin and its popup text.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub place: Place,
    pub popup: String,
}

impl Marker {
    pub fn new(place: Place, report: Option<&WeatherReport>) -> Self {
        let popup = popup_text(&place, report);
        Self { place, popup }
    }
}

fn popup_text(place: &Place, report: Option<&WeatherReport>) -> String {
    match report.and_then(|r| r.current.as_ref()) {
        Some(c) => format!(
            "{}\n{} °C, {}\nWind: {} km/h",
            place.display_name,
            c.temperature_c,
            weathercode::describe(c.weather_code),
            c.windspeed_kmh
        ),
        None => format!("{}\nNo weather info", place.display_name),
    }
}

/// What a map widget must offer.
pub trait MapView: Send {
    fn mount(&mut self, tiles: &TileLayer, view: Viewport);
    fn recenter(&mut self, place: &Place, zoom: u8);
    fn show_marker(&mut self, marker: &Marker);
    fn remove_marker(&mut self, marker: &Marker);
}

/// Receiver of places picked on the map.
#[async_trait]
pub trait PlacePicked: Send + Sync {
    async fn on_place_picked(&self, place: Place, report: Option<WeatherReport>) -> FetchOutcome;
}

#[async_trait]
impl PlacePicked for Coordinator {
    async fn on_place_picked(&self, place: Place, report: Option<WeatherReport>) -> FetchOutcome {
        self.select_from_map(place, report).await
    }
}

pub struct MapSurface<V> {
    view: V,
    geocoder: Arc<dyn Geocoder>,
    listener: Arc<dyn PlacePicked>,
    marker: Option<Marker>,
}

impl<V: MapView> MapSurface<V> {
    pub fn new(mut view: V, geocoder: Arc<dyn Geocoder>, listener: Arc<dyn PlacePicked>) -> Self {
        view.mount(&TileLayer::default(), INITIAL_VIEW);
        Self { view, geocoder, listener, marker: None }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    /// A click on the map. The point is named by reverse geocoding, or by its
    /// own coordinates if that yields nothing.
    pub async fn handle_click(&mut self, latitude: f64, longitude: f64) -> FetchOutcome {
        let place = match self.geocoder.reverse(latitude, longitude).await {
            Ok(name) => Place::new(latitude, longitude, name),
            Err(err) => {
                tracing::debug!(latitude, longitude, "Reverse geocode gave no name: {err}");
                Place::at_coordinates(latitude, longitude)
            }
        };
        self.pick(place).await
    }

    /// A query typed into the map's search box.
    pub async fn handle_search(&mut self, query: &str) -> Result<FetchOutcome, GeocodeError> {
        let place = self.geocoder.search(query).await?;
        self.view.recenter(&place, SEARCH_ZOOM);
        Ok(self.pick(place).await)
    }

    async fn pick(&mut self, place: Place) -> FetchOutcome {
        let outcome = self.listener.on_place_picked(place.clone(), None).await;
        match &outcome {
            FetchOutcome::Ready(report) => {
                self.place_marker(Marker::new(place, Some(report.as_ref())))
            }
            FetchOutcome::Failed(_) => self.place_marker(Marker::new(place, None)),
            // A newer pick owns the marker.
            FetchOutcome::Superseded | FetchOutcome::Skipped => {}
        }
        outcome
    }

    fn place_marker(&mut self, marker: Marker) {
        if let Some(old) = self.marker.take() {
            self.view.remove_marker(&old);
        }
        self.view.show_marker(&marker);
        self.marker = Some(marker);
    }
}
