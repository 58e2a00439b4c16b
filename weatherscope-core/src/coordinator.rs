//! Location selection: the single owner of "which place is shown, with which
//! weather".
//!
//! Both the search box and the map feed selections in here. Each fetch is
//! tagged with a sequence number when it is issued; a completion only lands
//! if it belongs to the most recently issued request, so the display always
//! follows the user's latest selection no matter which response arrives last.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    error::WeatherError,
    model::{CityRecord, Place, WeatherReport},
    provider::WeatherSource,
};

/// Coarse view of [`AppState`], derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub selected_place: Option<Place>,
    /// Kept across failed attempts so a transient error doesn't blank the view.
    pub latest_report: Option<Arc<WeatherReport>>,
    /// True only while the latest issued fetch is outstanding.
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub(crate) issued: u64,
    pub(crate) in_flight: Option<u64>,
}

impl AppState {
    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Loading
        } else if self.last_error.is_some() {
            Phase::Failed
        } else if self.latest_report.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    /// Invalidate whatever is in flight and return the new request's number.
    fn supersede(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight = None;
        self.issued
    }

    fn begin(&mut self, place: Place) -> u64 {
        let seq = self.supersede();
        self.selected_place = Some(place);
        self.is_loading = true;
        self.last_error = None;
        self.in_flight = Some(seq);
        seq
    }
}

/// What happened to one selection or refresh request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The report is now the one on display.
    Ready(Arc<WeatherReport>),
    /// The attempt failed; the message is what the user sees.
    Failed(String),
    /// A newer selection was issued before this one resolved; result dropped.
    Superseded,
    /// Nothing to do (no selection, or a fetch already running).
    Skipped,
}

#[derive(Debug)]
pub struct Coordinator {
    source: Arc<dyn WeatherSource>,
    state: watch::Sender<AppState>,
}

impl Coordinator {
    pub fn new(source: Arc<dyn WeatherSource>) -> Self {
        let (state, _) = watch::channel(AppState::default());
        Self { source, state }
    }

    /// Read-only feed of state changes for renderers.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Select a city picked from the search suggestions and fetch its weather.
    pub async fn select_from_search(&self, city: &CityRecord) -> FetchOutcome {
        match place_for_city(city) {
            Ok(place) => self.load(place).await,
            Err(err) => self.reject(err),
        }
    }

    /// Select a place picked on the map. A report the map already holds is
    /// shown as-is; otherwise the weather is fetched here.
    pub async fn select_from_map(&self, place: Place, report: Option<WeatherReport>) -> FetchOutcome {
        match report {
            Some(report) => self.show(place, report),
            None => self.load(place).await,
        }
    }

    /// Re-fetch the selected place. Skipped with no selection or while loading.
    pub async fn refresh(&self) -> FetchOutcome {
        let mut ticket = None;
        self.state.send_if_modified(|state| {
            if state.is_loading {
                return false;
            }
            let Some(place) = state.selected_place.clone() else {
                return false;
            };
            ticket = Some((state.begin(place.clone()), place));
            true
        });

        match ticket {
            Some((seq, place)) => self.run(seq, place).await,
            None => FetchOutcome::Skipped,
        }
    }

    async fn load(&self, place: Place) -> FetchOutcome {
        let mut seq = 0;
        self.state.send_modify(|state| seq = state.begin(place.clone()));
        self.run(seq, place).await
    }

    async fn run(&self, seq: u64, place: Place) -> FetchOutcome {
        tracing::debug!(seq, place = %place.display_name, "Fetching weather");
        let _guard = InFlight { state: &self.state, seq };
        let result = self.source.fetch_weather(place.latitude, place.longitude).await;
        self.finish(seq, &place, result)
    }

    fn finish(
        &self,
        seq: u64,
        place: &Place,
        result: Result<WeatherReport, WeatherError>,
    ) -> FetchOutcome {
        let mut outcome = FetchOutcome::Superseded;
        self.state.send_if_modified(|state| {
            if state.in_flight != Some(seq) {
                return false;
            }
            state.in_flight = None;
            state.is_loading = false;

            match result {
                Ok(report) => {
                    let report = Arc::new(report);
                    state.latest_report = Some(Arc::clone(&report));
                    state.last_error = None;
                    outcome = FetchOutcome::Ready(report);
                }
                Err(err) => {
                    tracing::warn!(place = %place.display_name, "Weather fetch failed: {err}");
                    let message = err.user_message();
                    state.last_error = Some(message.clone());
                    outcome = FetchOutcome::Failed(message);
                }
            }
            true
        });

        match &outcome {
            FetchOutcome::Ready(_) => tracing::info!(place = %place.display_name, "Weather loaded"),
            FetchOutcome::Superseded => {
                tracing::debug!(seq, place = %place.display_name, "Discarding stale weather response")
            }
            _ => {}
        }
        outcome
    }

    fn show(&self, place: Place, report: WeatherReport) -> FetchOutcome {
        let report = Arc::new(report);
        self.state.send_modify(|state| {
            state.supersede();
            state.selected_place = Some(place);
            state.latest_report = Some(Arc::clone(&report));
            state.is_loading = false;
            state.last_error = None;
        });
        FetchOutcome::Ready(report)
    }

    fn reject(&self, err: WeatherError) -> FetchOutcome {
        tracing::warn!("Selection rejected: {err}");
        let message = err.user_message();
        self.state.send_modify(|state| {
            state.supersede();
            state.is_loading = false;
            state.last_error = Some(message.clone());
        });
        FetchOutcome::Failed(message)
    }
}

/// Releases the loading state if a fetch future is dropped before it resolves.
struct InFlight<'a> {
    state: &'a watch::Sender<AppState>,
    seq: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let seq = self.seq;
        let released = self.state.send_if_modified(|state| {
            if state.in_flight != Some(seq) {
                return false;
            }
            state.in_flight = None;
            state.is_loading = false;
            true
        });
        if released {
            tracing::debug!(seq, "Weather fetch cancelled");
        }
    }
}

/// Build the selectable place for a dataset city.
pub fn place_for_city(city: &CityRecord) -> Result<Place, WeatherError> {
    let parse = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());

    match (parse(&city.lat), parse(&city.lng)) {
        (Some(lat), Some(lng)) => Ok(Place::new(lat, lng, city.label())),
        _ => Err(WeatherError::InvalidCoordinates {
            name: city.label(),
            lat: city.lat.clone(),
            lng: city.lng.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GatedSource, ScriptedSource, report_with_temp};

    fn mumbai() -> CityRecord {
        CityRecord {
            city: "Mumbai".into(),
            city_ascii: "Mumbai".into(),
            admin_name: "Mahārāshtra".into(),
            country: "India".into(),
            lat: "19.0761".into(),
            lng: "72.8777".into(),
        }
    }

    async fn wait_until(coord: &Coordinator, pred: impl Fn(&AppState) -> bool) {
        while !pred(&coord.snapshot()) {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn place_for_city_uses_label_and_coordinates() {
        let place = place_for_city(&mumbai()).expect("valid coordinates");
        assert_eq!(place, Place::new(19.0761, 72.8777, "Mumbai, India"));
    }

    #[test]
    fn place_for_city_rejects_garbage() {
        let mut city = mumbai();
        city.lng = "east-ish".into();
        assert!(matches!(place_for_city(&city), Err(WeatherError::InvalidCoordinates { .. })));
    }

    #[tokio::test]
    async fn starts_idle() {
        let coord = Coordinator::new(Arc::new(ScriptedSource::new(vec![])));
        let state = coord.snapshot();

        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.selected_place.is_none());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn search_selection_goes_loading_then_ready() {
        let (source, gates) = GatedSource::new();
        let coord = Coordinator::new(Arc::new(source.clone()));
        let gate = gates.open(19);

        let city = mumbai();

        let (outcome, ()) = tokio::join!(coord.select_from_search(&city), async {
            wait_until(&coord, |s| s.is_loading).await;
            assert_eq!(coord.snapshot().phase(), Phase::Loading);
            let _ = gate.send(Ok(report_with_temp(29.5)));
        });

        assert!(matches!(outcome, FetchOutcome::Ready(_)));
        assert_eq!(source.calls(), vec![(19.0761, 72.8777)]);

        let state = coord.snapshot();
        assert_eq!(state.phase(), Phase::Ready);
        assert!(state.last_error.is_none());
        let current = state.latest_report.as_ref().and_then(|r| r.current.as_ref());
        assert_eq!(current.map(|c| c.temperature_c), Some(29.5));
        assert_eq!(
            state.selected_place.map(|p| p.display_name),
            Some("Mumbai, India".to_string())
        );
    }

    #[tokio::test]
    async fn search_selection_failure_sets_error() {
        let source = ScriptedSource::new(vec![Err(WeatherError::Upstream {
            status: 500,
            body: "boom".into(),
        })]);
        let coord = Coordinator::new(Arc::new(source));

        let outcome = coord.select_from_search(&mumbai()).await;

        assert_eq!(outcome, FetchOutcome::Failed("Open-Meteo responded with 500".into()));
        let state = coord.snapshot();
        assert_eq!(state.phase(), Phase::Failed);
        assert_eq!(state.last_error.as_deref(), Some("Open-Meteo responded with 500"));
        assert!(state.latest_report.is_none());
    }

    #[tokio::test]
    async fn search_selection_goes_loading_then_failed() {
        let (source, gates) = GatedSource::new();
        let coord = Coordinator::new(Arc::new(source));
        let gate = gates.open(19);
        let city = mumbai();

        let (outcome, ()) = tokio::join!(coord.select_from_search(&city), async {
            wait_until(&coord, |s| s.is_loading).await;
            let state = coord.snapshot();
            assert_eq!(state.phase(), Phase::Loading);
            assert!(state.last_error.is_none());
            let _ = gate.send(Err(WeatherError::Upstream { status: 502, body: String::new() }));
        });

        assert_eq!(outcome, FetchOutcome::Failed("Open-Meteo responded with 502".into()));
        let state = coord.snapshot();
        assert_eq!(state.phase(), Phase::Failed);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn dropped_fetch_releases_loading_state() {
        let (source, gates) = GatedSource::new();
        let coord = Coordinator::new(Arc::new(source.clone()));
        let _never_answered = gates.open(19);
        let city = mumbai();

        tokio::select! {
            _ = coord.select_from_search(&city) => panic!("fetch should still be pending"),
            _ = wait_until(&coord, |s| s.is_loading) => {}
        }

        let state = coord.snapshot();
        assert!(!state.is_loading);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(
            state.selected_place.map(|p| p.display_name),
            Some("Mumbai, India".to_string())
        );

        let gate = gates.open(19);
        let (refreshed, ()) = tokio::join!(coord.refresh(), async {
            wait_until(&coord, |s| s.is_loading).await;
            let _ = gate.send(Ok(report_with_temp(27.0)));
        });

        assert!(matches!(refreshed, FetchOutcome::Ready(_)));
        assert_eq!(source.calls().len(), 2);
        assert_eq!(coord.snapshot().phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn failure_keeps_prior_report() {
        let source = ScriptedSource::new(vec![
            Ok(report_with_temp(21.0)),
            Err(WeatherError::Parse("truncated".into())),
        ]);
        let coord = Coordinator::new(Arc::new(source));

        coord.select_from_search(&mumbai()).await;
        let outcome = coord.refresh().await;

        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        let state = coord.snapshot();
        assert_eq!(state.phase(), Phase::Failed);
        let kept = state.latest_report.as_ref().and_then(|r| r.current.as_ref());
        assert_eq!(kept.map(|c| c.temperature_c), Some(21.0));
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let source = ScriptedSource::new(vec![
            Err(WeatherError::Parse("truncated".into())),
            Ok(report_with_temp(18.0)),
        ]);
        let coord = Coordinator::new(Arc::new(source));

        coord.select_from_search(&mumbai()).await;
        assert_eq!(coord.snapshot().phase(), Phase::Failed);

        coord.refresh().await;
        let state = coord.snapshot();
        assert_eq!(state.phase(), Phase::Ready);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn invalid_city_coordinates_fail_without_fetching() {
        let source = ScriptedSource::new(vec![]);
        let coord = Coordinator::new(Arc::new(source.clone()));
        let mut city = mumbai();
        city.lat = String::new();

        let outcome = coord.select_from_search(&city).await;

        assert!(matches!(outcome, FetchOutcome::Failed(ref m) if m.contains("Mumbai")));
        assert!(source.calls().is_empty());
        assert_eq!(coord.snapshot().phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn map_selection_with_report_skips_fetch() {
        let source = ScriptedSource::new(vec![]);
        let coord = Coordinator::new(Arc::new(source.clone()));
        let place = Place::new(48.85, 2.35, "Paris");

        let outcome = coord.select_from_map(place.clone(), Some(report_with_temp(14.0))).await;

        assert!(matches!(outcome, FetchOutcome::Ready(_)));
        assert!(source.calls().is_empty());
        let state = coord.snapshot();
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.selected_place, Some(place));
    }

    #[tokio::test]
    async fn map_selection_without_report_fetches() {
        let source = ScriptedSource::new(vec![Ok(report_with_temp(9.0))]);
        let coord = Coordinator::new(Arc::new(source.clone()));

        let outcome = coord.select_from_map(Place::new(59.91, 10.74, "Oslo"), None).await;

        assert!(matches!(outcome, FetchOutcome::Ready(_)));
        assert_eq!(source.calls(), vec![(59.91, 10.74)]);
    }

    #[tokio::test]
    async fn refresh_without_selection_is_skipped() {
        let source = ScriptedSource::new(vec![]);
        let coord = Coordinator::new(Arc::new(source.clone()));

        assert_eq!(coord.refresh().await, FetchOutcome::Skipped);
        assert!(source.calls().is_empty());
        assert_eq!(coord.snapshot().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn refresh_refetches_selected_place() {
        let source =
            ScriptedSource::new(vec![Ok(report_with_temp(20.0)), Ok(report_with_temp(22.0))]);
        let coord = Coordinator::new(Arc::new(source.clone()));

        coord.select_from_search(&mumbai()).await;
        let outcome = coord.refresh().await;

        let FetchOutcome::Ready(report) = outcome else {
            panic!("expected a fresh report, got {outcome:?}");
        };
        assert_eq!(report.current.as_ref().map(|c| c.temperature_c), Some(22.0));
        assert_eq!(source.calls(), vec![(19.0761, 72.8777), (19.0761, 72.8777)]);
    }

    #[tokio::test]
    async fn refresh_while_loading_is_skipped() {
        let (source, gates) = GatedSource::new();
        let coord = Coordinator::new(Arc::new(source.clone()));
        let gate = gates.open(19);

        let city = mumbai();

        let (first, refreshed) = tokio::join!(coord.select_from_search(&city), async {
            wait_until(&coord, |s| s.is_loading).await;
            let refreshed = coord.refresh().await;
            let _ = gate.send(Ok(report_with_temp(25.0)));
            refreshed
        });

        assert!(matches!(first, FetchOutcome::Ready(_)));
        assert_eq!(refreshed, FetchOutcome::Skipped);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn stale_response_never_overwrites_newer_selection() {
        let (source, gates) = GatedSource::new();
        let coord = Coordinator::new(Arc::new(source));
        let first = Place::new(1.0, 1.0, "First");
        let second = Place::new(2.0, 2.0, "Second");
        let first_gate = gates.open(1);
        let second_gate = gates.open(2);

        let (a, b, ()) = tokio::join!(
            coord.select_from_map(first.clone(), None),
            async {
                wait_until(&coord, |s| s.selected_place.as_ref() == Some(&first)).await;
                coord.select_from_map(second.clone(), None).await
            },
            async {
                wait_until(&coord, |s| s.selected_place.as_ref() == Some(&second)).await;
                // Newer request resolves first, the older one last.
                let _ = second_gate.send(Ok(report_with_temp(2.0)));
                tokio::task::yield_now().await;
                let _ = first_gate.send(Ok(report_with_temp(1.0)));
            }
        );

        assert_eq!(a, FetchOutcome::Superseded);
        assert!(matches!(b, FetchOutcome::Ready(_)));

        let state = coord.snapshot();
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.selected_place, Some(second));
        let shown = state.latest_report.as_ref().and_then(|r| r.current.as_ref());
        assert_eq!(shown.map(|c| c.temperature_c), Some(2.0));
    }

    #[tokio::test]
    async fn map_report_supersedes_pending_fetch() {
        let (source, gates) = GatedSource::new();
        let coord = Coordinator::new(Arc::new(source));
        let gate = gates.open(19);
        let paris = Place::new(48.85, 2.35, "Paris");

        let city = mumbai();

        let (searched, picked) = tokio::join!(coord.select_from_search(&city), async {
            wait_until(&coord, |s| s.is_loading).await;
            let picked = coord.select_from_map(paris.clone(), Some(report_with_temp(14.0))).await;
            let _ = gate.send(Ok(report_with_temp(30.0)));
            picked
        });

        assert_eq!(searched, FetchOutcome::Superseded);
        assert!(matches!(picked, FetchOutcome::Ready(_)));
        let state = coord.snapshot();
        assert!(!state.is_loading);
        assert_eq!(state.selected_place, Some(paris));
        let shown = state.latest_report.as_ref().and_then(|r| r.current.as_ref());
        assert_eq!(shown.map(|c| c.temperature_c), Some(14.0));
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let source = ScriptedSource::new(vec![Ok(report_with_temp(11.0))]);
        let coord = Coordinator::new(Arc::new(source));
        let mut rx = coord.subscribe();

        coord.select_from_search(&mumbai()).await;

        assert!(rx.has_changed().expect("sender alive"));
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.phase(), Phase::Ready);
    }
}
