//! Read-only projection of [`AppState`] into what a front-end shows.

use std::fmt;

use crate::{
    coordinator::AppState,
    model::{DailyForecastEntry, WeatherReport},
    weathercode,
};

/// Days shown in the forecast chart and table.
pub const FORECAST_DAYS: usize = 7;

const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Nothing selected yet.
    Empty,
    Loading,
    Ready,
    /// Shown alongside whatever report is still on display.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentView {
    pub temperature: String,
    pub observed_at: String,
    pub wind: String,
    pub condition: String,
}

/// One point of the min/max temperature chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub max_c: Option<f64>,
    pub min_c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRow {
    pub date: String,
    pub min: String,
    pub max: String,
    pub precipitation: String,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub location_label: String,
    pub status: Status,
    pub current: Option<CurrentView>,
    pub chart: Vec<ChartPoint>,
    pub rows: Vec<ForecastRow>,
}

impl Dashboard {
    pub fn from_state(state: &AppState) -> Self {
        let status = if state.is_loading {
            Status::Loading
        } else if let Some(err) = &state.last_error {
            Status::Error(err.clone())
        } else if state.latest_report.is_some() {
            Status::Ready
        } else {
            Status::Empty
        };

        let location_label = state
            .selected_place
            .as_ref()
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| "Selected location".to_string());

        let report = state.latest_report.as_deref();
        let days: &[DailyForecastEntry] = report.map(|r| r.days.as_slice()).unwrap_or_default();
        let days = &days[..days.len().min(FORECAST_DAYS)];

        Self {
            location_label,
            status,
            current: report.map(current_view),
            chart: days.iter().map(chart_point).collect(),
            rows: days.iter().map(forecast_row).collect(),
        }
    }
}

fn current_view(report: &WeatherReport) -> CurrentView {
    let Some(c) = &report.current else {
        return CurrentView {
            temperature: format!("{PLACEHOLDER} °C"),
            observed_at: String::new(),
            wind: format!("{PLACEHOLDER} km/h"),
            condition: weathercode::describe_opt(None),
        };
    };

    let observed_at = if report.timezone.is_empty() {
        c.observed_at.format("%Y-%m-%d %H:%M").to_string()
    } else {
        format!("{} ({})", c.observed_at.format("%Y-%m-%d %H:%M"), report.timezone)
    };

    CurrentView {
        temperature: format!("{} °C", c.temperature_c),
        observed_at,
        wind: format!("{} km/h", c.windspeed_kmh),
        condition: weathercode::describe(c.weather_code),
    }
}

fn chart_point(day: &DailyForecastEntry) -> ChartPoint {
    ChartPoint {
        label: day.date.format("%a, %b %-d").to_string(),
        max_c: day.temp_max_c,
        min_c: day.temp_min_c,
    }
}

fn forecast_row(day: &DailyForecastEntry) -> ForecastRow {
    ForecastRow {
        date: day.date.format("%Y-%m-%d").to_string(),
        min: cell(day.temp_min_c),
        max: cell(day.temp_max_c),
        precipitation: cell(day.precipitation_mm),
        condition: day.weather_code.map(weathercode::describe).unwrap_or_default(),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string())
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Status::Empty => return writeln!(f, "Search a city or click the map to load weather."),
            Status::Loading => return writeln!(f, "Fetching weather data..."),
            Status::Error(msg) => writeln!(f, "Error: {msg}")?,
            Status::Ready => {}
        }

        let Some(current) = &self.current else {
            return Ok(());
        };

        writeln!(f, "{}", self.location_label)?;
        writeln!(f, "  {}  {}", current.temperature, current.condition)?;
        writeln!(f, "  Wind {}", current.wind)?;
        if !current.observed_at.is_empty() {
            writeln!(f, "  Observed {}", current.observed_at)?;
        }

        if self.rows.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "{}-day forecast", FORECAST_DAYS)?;
        writeln!(
            f,
            "  {:<12}{:>8}{:>8}{:>13}  {}",
            "Date", "Min (°C)", "Max (°C)", "Precip (mm)", "Condition"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "  {:<12}{:>8}{:>8}{:>13}  {}",
                row.date, row.min, row.max, row.precipitation, row.condition
            )?;
        }
        Ok(())
    }
}
