//! Core library for the `weatherscope` weather lookup app.
//!
//! This crate defines:
//! - The Open-Meteo forecast client and Nominatim geocoder
//! - The static city directory behind the search box
//! - The selection coordinator that owns what is on display
//! - The map surface, behind a narrow capability trait
//! - The render model handed to front-ends
//!
//! It is used by `weatherscope-cli`, but any front-end can drive it.

pub mod cities;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod map;
pub mod model;
pub mod provider;
pub mod weathercode;

#[cfg(test)]
pub(crate) mod testing;

pub use cities::{CityDirectory, CityMatches, MAX_MATCHES};
pub use config::{Config, Endpoints};
pub use coordinator::{AppState, Coordinator, FetchOutcome, Phase};
pub use display::Dashboard;
pub use error::{DirectoryError, GeocodeError, WeatherError};
pub use map::{MapSurface, MapView, Marker, PlacePicked};
pub use model::{CityRecord, CurrentConditions, DailyForecastEntry, Place, WeatherReport};
pub use provider::{Geocoder, Services, WeatherSource, services_from_config};
