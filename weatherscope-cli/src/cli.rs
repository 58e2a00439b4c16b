use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, InquireError, Select, Text};
use weatherscope_core::{
    CityDirectory, CityRecord, Config, Coordinator, Dashboard, FetchOutcome, GeocodeError,
    MapSurface, services_from_config,
};

use crate::terminal_map::TerminalMap;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherscope", version, about = "Current weather and a 7-day forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List cities matching a query.
    Search {
        /// Part of a city, region, or country name.
        query: String,
    },

    /// Pick a city and show its weather.
    Show {
        query: String,

        /// Take the first match instead of asking.
        #[arg(long)]
        first: bool,

        /// Print the Open-Meteo response as received.
        #[arg(long)]
        raw: bool,
    },

    /// Show the weather at a point, as if clicked on the map.
    #[command(allow_negative_numbers = true)]
    Point { latitude: f64, longitude: f64 },

    /// Find a place with the map search box and show its weather.
    Place {
        /// Free-text place query, e.g. "Eiffel Tower".
        query: String,
    },

    /// Search, pick and refresh in a loop.
    Interactive,

    /// Configure endpoints, user agent and city dataset.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Search { query } => {
                let directory = config.city_directory()?;
                list_matches(&directory, &query);
            }
            Command::Show { query, first, raw } => {
                let directory = config.city_directory()?;
                let Some(city) = pick_city(&directory, &query, first)? else {
                    bail!("No city matches '{query}'");
                };

                let coord = coordinator(&config)?;
                let report = match coord.select_from_search(city).await {
                    FetchOutcome::Ready(report) => report,
                    FetchOutcome::Failed(msg) => bail!(msg),
                    FetchOutcome::Superseded | FetchOutcome::Skipped => {
                        bail!("Weather request did not complete")
                    }
                };

                if raw {
                    println!("{:#}", report.raw);
                } else {
                    print!("{}", Dashboard::from_state(&coord.snapshot()));
                }
            }
            Command::Point { latitude, longitude } => {
                let (coord, mut map) = map_session(&config)?;
                let outcome = map.handle_click(latitude, longitude).await;
                finish_one_shot(&coord, outcome)?;
            }
            Command::Place { query } => {
                let (coord, mut map) = map_session(&config)?;
                let outcome = map
                    .handle_search(&query)
                    .await
                    .map_err(|err| anyhow!(geocode_failure(&err, &query)))?;
                finish_one_shot(&coord, outcome)?;
            }
            Command::Interactive => interactive(&config).await?,
            Command::Configure => configure(config)?,
        }

        Ok(())
    }
}

fn coordinator(config: &Config) -> anyhow::Result<Arc<Coordinator>> {
    let services = services_from_config(config)?;
    Ok(Arc::new(Coordinator::new(services.weather)))
}

fn map_session(config: &Config) -> anyhow::Result<(Arc<Coordinator>, MapSurface<TerminalMap>)> {
    let services = services_from_config(config)?;
    let coord = Arc::new(Coordinator::new(services.weather));
    let map = MapSurface::new(TerminalMap::default(), services.geocoder, coord.clone());
    Ok((coord, map))
}

fn finish_one_shot(coord: &Coordinator, outcome: FetchOutcome) -> anyhow::Result<()> {
    match outcome {
        FetchOutcome::Ready(_) => {
            print!("{}", Dashboard::from_state(&coord.snapshot()));
            Ok(())
        }
        FetchOutcome::Failed(msg) => bail!(msg),
        FetchOutcome::Superseded | FetchOutcome::Skipped => {
            bail!("Weather request did not complete")
        }
    }
}

fn geocode_failure(err: &GeocodeError, query: &str) -> String {
    match err {
        GeocodeError::LookupMiss => format!("No place found for '{}'.", query.trim()),
        other => other.to_string(),
    }
}

fn list_matches(directory: &CityDirectory, query: &str) {
    let matches = directory.search(query);
    if matches.is_empty() {
        println!("No cities match '{query}'.");
        return;
    }
    for city in matches.records() {
        println!("{:<40} {:>9}, {:>9}", describe_city(city), city.lat, city.lng);
    }
}

fn describe_city(city: &CityRecord) -> String {
    if city.admin_name.is_empty() {
        city.label()
    } else {
        format!("{}, {}, {}", city.city, city.admin_name, city.country)
    }
}

/// Resolve a query to one city, asking when there is more than one match.
fn pick_city<'a>(
    directory: &'a CityDirectory,
    query: &str,
    first: bool,
) -> Result<Option<&'a CityRecord>, InquireError> {
    let mut records = directory.search(query).into_records();
    if records.len() <= 1 || first {
        return Ok(records.into_iter().next());
    }

    let labels: Vec<String> = records.iter().map(|c| describe_city(c)).collect();
    let chosen = Select::new("Which city?", labels).raw_prompt()?;
    Ok(Some(records.swap_remove(chosen.index)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    SearchCity,
    ClickMap,
    SearchMap,
    Refresh,
    Quit,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::SearchCity => "Search for a city",
            Self::ClickMap => "Pick a point on the map",
            Self::SearchMap => "Find a place on the map",
            Self::Refresh => "Refresh",
            Self::Quit => "Quit",
        };
        f.write_str(label)
    }
}

async fn interactive(config: &Config) -> anyhow::Result<()> {
    let directory = config.city_directory()?;
    let (coord, mut map) = map_session(config)?;

    println!("{}", Dashboard::from_state(&coord.snapshot()));

    loop {
        let actions = vec![
            Action::SearchCity,
            Action::ClickMap,
            Action::SearchMap,
            Action::Refresh,
            Action::Quit,
        ];
        let action = match Select::new("What next?", actions).prompt() {
            Ok(Action::Quit) => break,
            Ok(action) => action,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        // Esc inside a sub-prompt goes back to the menu.
        match perform(action, &directory, &coord, &mut map).await {
            Ok(true) => println!("{}", Dashboard::from_state(&coord.snapshot())),
            Ok(false) | Err(InquireError::OperationCanceled) => {}
            Err(InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

/// Run one menu action. Returns whether the dashboard changed.
async fn perform(
    action: Action,
    directory: &CityDirectory,
    coord: &Coordinator,
    map: &mut MapSurface<TerminalMap>,
) -> Result<bool, InquireError> {
    match action {
        Action::SearchCity => {
            let query = Text::new("City:").prompt()?;
            let Some(city) = pick_city(directory, &query, false)? else {
                println!("No cities match '{}'.", query.trim());
                return Ok(false);
            };
            coord.select_from_search(city).await;
        }
        Action::ClickMap => {
            let latitude = CustomType::<f64>::new("Latitude:").prompt()?;
            let longitude = CustomType::<f64>::new("Longitude:").prompt()?;
            map.handle_click(latitude, longitude).await;
        }
        Action::SearchMap => {
            let query = Text::new("Place:").prompt()?;
            if let Err(err) = map.handle_search(&query).await {
                println!("{}", geocode_failure(&err, &query));
                return Ok(false);
            }
        }
        Action::Refresh => {
            if coord.refresh().await == FetchOutcome::Skipped {
                println!("Nothing to refresh yet.");
                return Ok(false);
            }
        }
        Action::Quit => return Ok(false),
    }

    Ok(true)
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let forecast_url = Text::new("Forecast URL:")
        .with_default(&config.endpoints.forecast_url)
        .prompt()?;
    let reverse_url = Text::new("Reverse geocoding URL:")
        .with_default(&config.endpoints.reverse_geocode_url)
        .prompt()?;
    let search_url = Text::new("Place search URL:")
        .with_default(&config.endpoints.search_url)
        .prompt()?;
    let user_agent = Text::new("User agent:").with_default(config.user_agent()).prompt()?;
    let timeout_secs = CustomType::<u64>::new("Request timeout in seconds (0 for none):")
        .with_default(config.timeout_secs.unwrap_or(0))
        .prompt()?;

    let current_path = config
        .cities_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let cities_path = Text::new("City dataset (blank for the bundled list):")
        .with_initial_value(&current_path)
        .prompt()?;

    config.endpoints.forecast_url = forecast_url.trim().to_string();
    config.endpoints.reverse_geocode_url = reverse_url.trim().to_string();
    config.endpoints.search_url = search_url.trim().to_string();
    config.user_agent = Some(user_agent.trim().to_string()).filter(|s| !s.is_empty());
    config.timeout_secs = Some(timeout_secs).filter(|s| *s > 0);
    config.cities_path = Some(cities_path.trim()).filter(|s| !s.is_empty()).map(PathBuf::from);

    if config.cities_path.is_some() {
        config.city_directory().context("City dataset is not usable")?;
    }

    if !Confirm::new("Save configuration?").with_default(true).prompt()? {
        println!("Nothing saved.");
        return Ok(());
    }

    config.save()?;
    println!("Saved to {}", Config::config_file_path()?.display());

    Ok(())
}
