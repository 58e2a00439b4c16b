//! In-memory sources shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::oneshot;

use crate::{
    error::{GeocodeError, WeatherError},
    model::{CurrentConditions, DailyForecastEntry, Place, WeatherReport},
    provider::{Geocoder, WeatherSource},
};

type Reply = Result<WeatherReport, WeatherError>;

pub fn report_with_temp(temperature_c: f64) -> WeatherReport {
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");
    let days = (0..8u32)
        .map(|i| DailyForecastEntry {
            date: start + chrono::Days::new(u64::from(i)),
            temp_max_c: Some(temperature_c + 3.0),
            temp_min_c: Some(temperature_c - 4.0),
            precipitation_mm: Some(f64::from(i) * 0.5),
            weather_code: Some(61),
            windspeed_max_kmh: Some(20.0),
        })
        .collect();

    WeatherReport {
        current: Some(CurrentConditions {
            temperature_c,
            windspeed_kmh: 12.0,
            wind_direction_deg: 180.0,
            weather_code: 61,
            observed_at: start.and_hms_opt(14, 0, 0).expect("valid time"),
        }),
        days,
        timezone: "UTC".to_string(),
        raw: serde_json::json!({ "current_weather": { "temperature": temperature_c } }),
    }
}

/// Answers calls with pre-scripted replies, in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<(f64, f64)>>>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self { replies: Arc::new(Mutex::new(replies.into())), calls: Arc::default() }
    }

    pub fn calls(&self) -> Vec<(f64, f64)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl WeatherSource for ScriptedSource {
    async fn fetch_weather(&self, latitude: f64, longitude: f64) -> Reply {
        self.calls.lock().expect("calls lock").push((latitude, longitude));
        let next = self.replies.lock().expect("replies lock").pop_front();
        next.unwrap_or_else(|| Err(WeatherError::Parse("no scripted reply".into())))
    }
}

/// Holds each call until the test releases it through its gate.
///
/// Gates are keyed by the integer part of the requested latitude.
#[derive(Debug, Clone, Default)]
pub struct GatedSource {
    gates: Arc<Mutex<HashMap<i64, oneshot::Receiver<Reply>>>>,
    calls: Arc<Mutex<Vec<(f64, f64)>>>,
}

pub struct Gates(GatedSource);

impl Gates {
    pub fn open(&self, latitude: i64) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.0.gates.lock().expect("gates lock").insert(latitude, rx);
        tx
    }
}

impl GatedSource {
    pub fn new() -> (Self, Gates) {
        let source = Self::default();
        (source.clone(), Gates(source))
    }

    pub fn calls(&self) -> Vec<(f64, f64)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl WeatherSource for GatedSource {
    async fn fetch_weather(&self, latitude: f64, longitude: f64) -> Reply {
        self.calls.lock().expect("calls lock").push((latitude, longitude));
        let gate = self.gates.lock().expect("gates lock").remove(&(latitude as i64));
        match gate {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(WeatherError::Parse("gate dropped".into()))),
            None => Err(WeatherError::Parse(format!("no gate for latitude {latitude}"))),
        }
    }
}

/// Geocoder with canned answers.
#[derive(Debug, Clone, Default)]
pub struct StubGeocoder {
    pub reverse_name: Option<String>,
    pub search_hit: Option<Place>,
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<String, GeocodeError> {
        self.reverse_name.clone().ok_or(GeocodeError::LookupMiss)
    }

    async fn search(&self, _query: &str) -> Result<Place, GeocodeError> {
        self.search_hit.clone().ok_or(GeocodeError::LookupMiss)
    }
}
