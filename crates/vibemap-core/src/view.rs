//! Per-view state machine.
//!
//! A [`ViewEngine`] holds the two orthogonal progressions of a mounted
//! view, the mapping script / surface and the dataset, plus the current
//! [`FilterState`]. Every input is applied through a method that records
//! the new fact and then calls [`ViewEngine::reconcile`], the single
//! place where markers are synchronized and the user-visible status is
//! derived. Markers are only synchronized while the surface is ready and
//! the latest dataset has arrived.
//!
//! Completions of suspended work carry the mount generation they were
//! started under. Teardown bumps the generation, so a completion arriving
//! afterwards is ignored and never touches the destroyed surface.

use tracing::{debug, info, warn};
use vibemap_types::{FilterState, MapOptions, Place, ViewId, ViewStatus};

use crate::config::{MapConfig, MarkerConfig};
use crate::error::{ScriptLoadError, SurfaceError};
use crate::filter;
use crate::loader::LoadOutcome;
use crate::source::{FetchOutcome, FetchTicket};
use crate::surface::{MapBackend, MapSurface};
use crate::sync::{MarkerSynchronizer, SyncReport};

/// Progress of the mapping script and the map built on it.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptState {
    /// No load requested yet.
    Unloaded,
    /// Waiting on the shared script load.
    Loading,
    /// The script failed to load. Terminal for this process.
    Failed(ScriptLoadError),
    /// The script loaded but the map could not be constructed.
    SurfaceFailed(SurfaceError),
    /// The map exists and accepts markers.
    SurfaceReady,
}

/// Progress of the dataset for the requested location.
#[derive(Debug, Clone, PartialEq)]
pub enum DataState {
    /// No location requested yet.
    NoData,
    /// Waiting on the fetch identified by `ticket`.
    Fetching {
        /// The latest issued fetch.
        ticket: FetchTicket,
    },
    /// The latest fetch failed.
    Failed {
        /// Location that was requested.
        location: String,
        /// Failure description.
        message: String,
    },
    /// The latest fetch succeeded.
    Ready {
        /// Location the places were fetched for.
        location: String,
        /// The full, unfiltered dataset.
        places: Vec<Place>,
    },
}

/// State machine for one mounted map view.
#[derive(Debug)]
pub struct ViewEngine<B: MapBackend> {
    id: ViewId,
    surface: MapSurface<B>,
    options: MapOptions,
    markers: MarkerSynchronizer,
    script: ScriptState,
    data: DataState,
    filter: FilterState,
    generation: u64,
    torn_down: bool,
    status: ViewStatus,
    last_sync: Option<SyncReport>,
}

impl<B: MapBackend> ViewEngine<B> {
    /// Create an engine for a view rendering through `backend`.
    pub fn new(backend: B, map: &MapConfig, markers: MarkerConfig) -> Self {
        Self {
            id: ViewId::new(),
            surface: MapSurface::new(backend, map.container_id.clone()),
            options: map.map_options(),
            markers: MarkerSynchronizer::new(markers),
            script: ScriptState::Unloaded,
            data: DataState::NoData,
            filter: FilterState::All,
            generation: 0,
            torn_down: false,
            status: ViewStatus::Loading,
            last_sync: None,
        }
    }

    /// Identifier of this view, for logs.
    pub const fn id(&self) -> ViewId {
        self.id
    }

    /// The current mount generation.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the view has been torn down.
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// The user-visible status as of the last reconcile.
    pub const fn status(&self) -> &ViewStatus {
        &self.status
    }

    /// Script and surface progress.
    pub const fn script_state(&self) -> &ScriptState {
        &self.script
    }

    /// Dataset progress.
    pub const fn data_state(&self) -> &DataState {
        &self.data
    }

    /// The current filter selection.
    pub const fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// The map surface.
    pub const fn surface(&self) -> &MapSurface<B> {
        &self.surface
    }

    /// The report of the most recent marker sync.
    pub const fn last_sync(&self) -> Option<&SyncReport> {
        self.last_sync.as_ref()
    }

    /// The location the displayed dataset belongs to.
    pub fn location(&self) -> Option<&str> {
        match &self.data {
            DataState::Ready { location, .. } => Some(location.as_str()),
            _ => None,
        }
    }

    /// The full dataset, once the latest fetch has succeeded.
    pub fn places(&self) -> Option<&[Place]> {
        match &self.data {
            DataState::Ready { places, .. } => Some(places.as_slice()),
            _ => None,
        }
    }

    /// The dataset projected through the current filter.
    pub fn visible_places(&self) -> Vec<Place> {
        self.places()
            .map(|places| filter::apply(places, &self.filter))
            .unwrap_or_default()
    }

    /// Record that the script load is starting. Returns the generation
    /// the completion must carry, or `None` if a load was already
    /// started or the view is torn down.
    pub fn begin_script_load(&mut self) -> Option<u64> {
        if self.torn_down || self.script != ScriptState::Unloaded {
            return None;
        }
        self.script = ScriptState::Loading;
        self.reconcile();
        Some(self.generation)
    }

    /// Apply the outcome of the script load. Returns whether it was applied.
    pub fn on_script_loaded(&mut self, generation: u64, outcome: LoadOutcome) -> bool {
        if !self.accepts(generation) || self.script != ScriptState::Loading {
            debug!(view = %self.id, generation, "ignoring script completion");
            return false;
        }
        self.script = match outcome {
            Ok(()) => match self.surface.create(&self.options) {
                Ok(_) => ScriptState::SurfaceReady,
                Err(e) => {
                    warn!(view = %self.id, error = %e, "map surface construction failed");
                    ScriptState::SurfaceFailed(e)
                }
            },
            Err(e) => {
                warn!(view = %self.id, error = %e, "mapping script unavailable");
                ScriptState::Failed(e)
            }
        };
        self.reconcile();
        true
    }

    /// Record that `ticket` is now the fetch whose result will be shown.
    ///
    /// Markers from the previous dataset stay visible until the new one
    /// arrives. Returns the generation the completion must carry.
    pub fn begin_fetch(&mut self, ticket: FetchTicket) -> u64 {
        if !self.torn_down {
            debug!(view = %self.id, seq = ticket.seq, location = %ticket.location_key, "fetch started");
            self.data = DataState::Fetching { ticket };
            self.reconcile();
        }
        self.generation
    }

    /// Apply a fetch completion. Stale outcomes, outcomes for any ticket
    /// other than the one being waited on, and completions from an
    /// earlier generation are ignored. Returns whether it was applied.
    pub fn on_fetch_completed(&mut self, generation: u64, outcome: FetchOutcome) -> bool {
        if !self.accepts(generation) {
            debug!(view = %self.id, generation, "ignoring fetch completion after teardown");
            return false;
        }
        let (ticket, result) = match outcome {
            FetchOutcome::Current { ticket, result } => (ticket, result),
            FetchOutcome::Stale { ticket } => {
                debug!(view = %self.id, seq = ticket.seq, "ignoring stale fetch");
                return false;
            }
        };
        let awaited = matches!(&self.data, DataState::Fetching { ticket: current } if *current == ticket);
        if !awaited {
            debug!(view = %self.id, seq = ticket.seq, "ignoring superseded fetch");
            return false;
        }

        self.data = match result {
            Ok(places) => {
                info!(
                    view = %self.id,
                    location = %ticket.location_key,
                    count = places.len(),
                    "dataset ready"
                );
                DataState::Ready {
                    location: ticket.location_key,
                    places,
                }
            }
            Err(e) => {
                warn!(view = %self.id, error = %e, "dataset fetch failed");
                DataState::Failed {
                    location: ticket.location_key,
                    message: e.to_string(),
                }
            }
        };
        self.reconcile();
        true
    }

    /// Change the filter. Re-synchronizes when the selection changed.
    pub fn set_filter(&mut self, filter: FilterState) {
        if self.torn_down || self.filter == filter {
            return;
        }
        debug!(view = %self.id, %filter, "filter changed");
        self.filter = filter;
        self.reconcile();
    }

    /// Tear the view down: destroy the surface and every marker, and
    /// invalidate all pending completions. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.generation = self.generation.saturating_add(1);
        self.surface.destroy();
        self.markers.reset();
        info!(view = %self.id, "view torn down");
    }

    /// Derive the status from the current facts, synchronizing markers
    /// when the surface is ready and the dataset has arrived.
    pub fn reconcile(&mut self) -> &ViewStatus {
        if self.torn_down {
            return &self.status;
        }

        self.status = match (&self.script, &self.data) {
            (ScriptState::Failed(e), _) => error_status(e),
            (ScriptState::SurfaceFailed(e), _) => error_status(e),
            (ScriptState::SurfaceReady, DataState::Failed { message, .. }) => {
                let removed = self.markers.clear(&mut self.surface);
                if removed > 0 {
                    debug!(view = %self.id, removed, "cleared markers after failed fetch");
                }
                ViewStatus::Error {
                    message: message.clone(),
                }
            }
            (_, DataState::Failed { message, .. }) => ViewStatus::Error {
                message: message.clone(),
            },
            (ScriptState::SurfaceReady, DataState::Ready { location, places }) => {
                let visible = filter::apply(places, &self.filter);
                match self.markers.sync(&mut self.surface, &visible) {
                    Ok(report) => {
                        let status = ViewStatus::Ready {
                            location: location.clone(),
                            visible: count(report.live()),
                            total: count(places.len()),
                        };
                        self.last_sync = Some(report);
                        status
                    }
                    Err(e) => error_status(&e),
                }
            }
            _ => ViewStatus::Loading,
        };
        &self.status
    }

    const fn accepts(&self, generation: u64) -> bool {
        !self.torn_down && generation == self.generation
    }
}

fn error_status(error: &impl core::fmt::Display) -> ViewStatus {
    ViewStatus::Error {
        message: error.to_string(),
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vibemap_types::{Coordinate, Emotion, EmotionScores, MapCommand, PlaceId};

    use super::*;
    use crate::backend::CommandBackend;
    use crate::error::{FetchError, StoreError};

    fn place(id: &str, emotion: &str) -> Place {
        let mut scores = EmotionScores::new();
        scores.insert(Emotion::from(emotion), 0.6);
        Place {
            id: PlaceId::new(id),
            name: id.to_owned(),
            coordinate: Coordinate::new(37.77, -122.41),
            emotion_scores: scores,
            dominant_emotion: Emotion::from(emotion),
            rating: 3.5,
            category_tags: Vec::new(),
            location_key: String::from("SF"),
        }
    }

    fn ticket(seq: u64, location: &str) -> FetchTicket {
        FetchTicket {
            seq,
            location_key: location.to_owned(),
        }
    }

    fn engine() -> (
        ViewEngine<CommandBackend>,
        tokio::sync::mpsc::UnboundedReceiver<MapCommand>,
    ) {
        let (backend, rx) = CommandBackend::channel();
        (
            ViewEngine::new(backend, &MapConfig::default(), MarkerConfig::default()),
            rx,
        )
    }

    fn ready(places: Vec<Place>, t: FetchTicket) -> FetchOutcome {
        FetchOutcome::Current {
            ticket: t,
            result: Ok(places),
        }
    }

    #[test]
    fn data_before_surface_waits() {
        let (mut view, _rx) = engine();
        let generation = view.begin_fetch(ticket(1, "SF"));
        assert!(view.on_fetch_completed(generation, ready(vec![place("a", "happy")], ticket(1, "SF"))));
        assert_eq!(view.status(), &ViewStatus::Loading);
        assert_eq!(view.surface().marker_count(), 0);

        let generation = view.begin_script_load().unwrap();
        assert!(view.on_script_loaded(generation, Ok(())));
        assert_eq!(view.surface().marker_count(), 1);
        assert!(matches!(view.status(), ViewStatus::Ready { visible: 1, total: 1, .. }));
    }

    #[test]
    fn script_load_only_starts_once() {
        let (mut view, _rx) = engine();
        assert!(view.begin_script_load().is_some());
        assert!(view.begin_script_load().is_none());
    }

    #[test]
    fn script_failure_is_reported() {
        let (mut view, _rx) = engine();
        let generation = view.begin_script_load().unwrap();
        view.on_script_loaded(generation, Err(ScriptLoadError::MissingApiKey));
        assert!(matches!(view.status(), ViewStatus::Error { .. }));
        assert!(!view.surface().is_ready());
    }

    #[test]
    fn superseded_ticket_is_ignored() {
        let (mut view, _rx) = engine();
        let generation = view.begin_script_load().unwrap();
        view.on_script_loaded(generation, Ok(()));
        view.begin_fetch(ticket(1, "A"));
        view.begin_fetch(ticket(2, "B"));
        assert!(view.on_fetch_completed(generation, ready(vec![place("b", "happy")], ticket(2, "B"))));
        assert!(!view.on_fetch_completed(generation, ready(vec![place("a", "happy")], ticket(1, "A"))));
        assert_eq!(view.location(), Some("B"));
    }

    #[test]
    fn filter_change_resyncs() {
        let (mut view, _rx) = engine();
        let generation = view.begin_script_load().unwrap();
        view.on_script_loaded(generation, Ok(()));
        view.begin_fetch(ticket(1, "SF"));
        view.on_fetch_completed(
            generation,
            ready(vec![place("a", "happy"), place("b", "lonely")], ticket(1, "SF")),
        );
        assert_eq!(view.surface().marker_count(), 2);
        view.set_filter(FilterState::parse("lonely"));
        assert_eq!(view.surface().marker_count(), 1);
        assert!(matches!(view.status(), ViewStatus::Ready { visible: 1, total: 2, .. }));
    }

    #[test]
    fn failed_fetch_clears_markers() {
        let (mut view, _rx) = engine();
        let generation = view.begin_script_load().unwrap();
        view.on_script_loaded(generation, Ok(()));
        view.begin_fetch(ticket(1, "SF"));
        view.on_fetch_completed(generation, ready(vec![place("a", "happy")], ticket(1, "SF")));

        view.begin_fetch(ticket(2, "LA"));
        assert_eq!(view.surface().marker_count(), 1);
        view.on_fetch_completed(
            generation,
            FetchOutcome::Current {
                ticket: ticket(2, "LA"),
                result: Err(FetchError {
                    location_key: String::from("LA"),
                    source: StoreError::Unavailable(String::from("down")),
                }),
            },
        );
        assert_eq!(view.surface().marker_count(), 0);
        assert!(matches!(view.status(), ViewStatus::Error { .. }));
    }

    #[test]
    fn completions_after_teardown_are_ignored() {
        let (mut view, _rx) = engine();
        let generation = view.begin_script_load().unwrap();
        view.on_script_loaded(generation, Ok(()));
        view.begin_fetch(ticket(1, "SF"));
        view.teardown();
        assert!(!view.on_fetch_completed(generation, ready(vec![place("a", "happy")], ticket(1, "SF"))));
        assert!(view.surface().is_destroyed());
        assert_eq!(view.surface().marker_count(), 0);
    }
}
