//! Map surface: lifecycle of one map instance and the markers on it.
//!
//! A [`MapSurface`] wraps a [`MapBackend`] (the capability interface of
//! the mapping library) and tracks every live marker it has created. The
//! surface is created at most once, torn down exactly once, and never
//! reused after teardown. Dropping a surface tears it down.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};
use vibemap_types::{
    Bounds, Coordinate, MapHandle, MapOptions, MarkerHandle, MarkerSpec, PopupContent, PopupHandle,
};

use crate::error::{BackendError, SurfaceError};

/// Capability interface of a mapping library.
///
/// Implementations perform the side effects; [`MapSurface`] owns the
/// bookkeeping. Every call is synchronous: a backend either applies the
/// operation or rejects it immediately.
pub trait MapBackend {
    /// Construct a map inside the container element.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the map cannot be constructed.
    fn create_map(
        &mut self,
        container_id: &str,
        options: &MapOptions,
    ) -> Result<MapHandle, BackendError>;

    /// Destroy a map and everything attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend refuses.
    fn destroy_map(&mut self, map: MapHandle) -> Result<(), BackendError>;

    /// Add a marker to a map.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the marker cannot be drawn.
    fn create_marker(
        &mut self,
        map: MapHandle,
        spec: &MarkerSpec,
    ) -> Result<MarkerHandle, BackendError>;

    /// Remove a marker and its click handler.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend refuses.
    fn destroy_marker(&mut self, marker: MarkerHandle) -> Result<(), BackendError>;

    /// Build a detail popup.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the popup cannot be built.
    fn create_popup(&mut self, content: &PopupContent) -> Result<PopupHandle, BackendError>;

    /// Open `popup` when `marker` is clicked.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the handler cannot be attached.
    fn attach_click_handler(
        &mut self,
        marker: MarkerHandle,
        popup: PopupHandle,
    ) -> Result<(), BackendError>;

    /// Move the viewport so `bounds` is fully visible.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend refuses.
    fn fit_bounds(&mut self, map: MapHandle, bounds: &Bounds) -> Result<(), BackendError>;
}

/// One map instance and its live markers.
#[derive(Debug)]
pub struct MapSurface<B: MapBackend> {
    backend: B,
    container_id: String,
    map: Option<MapHandle>,
    destroyed: bool,
    markers: BTreeSet<MarkerHandle>,
}

impl<B: MapBackend> MapSurface<B> {
    /// Wrap `backend` for a map mounted into `container_id`. No map is
    /// constructed until [`MapSurface::create`].
    pub fn new(backend: B, container_id: impl Into<String>) -> Self {
        Self {
            backend,
            container_id: container_id.into(),
            map: None,
            destroyed: false,
            markers: BTreeSet::new(),
        }
    }

    /// Construct the map. Calling again on a live surface returns the
    /// existing handle.
    ///
    /// # Errors
    ///
    /// - [`SurfaceError::MissingContainer`] if the container id is blank.
    /// - [`SurfaceError::Destroyed`] after teardown.
    /// - [`SurfaceError::Init`] if the backend refuses.
    pub fn create(&mut self, options: &MapOptions) -> Result<MapHandle, SurfaceError> {
        if self.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        if let Some(map) = self.map {
            return Ok(map);
        }
        if self.container_id.trim().is_empty() {
            return Err(SurfaceError::MissingContainer);
        }
        let map = self.backend.create_map(&self.container_id, options)?;
        info!(%map, container = %self.container_id, "map surface created");
        self.map = Some(map);
        Ok(map)
    }

    /// The map handle, once created and until destroyed.
    pub const fn map(&self) -> Option<MapHandle> {
        self.map
    }

    /// Whether the map exists and has not been torn down.
    pub const fn is_ready(&self) -> bool {
        self.map.is_some() && !self.destroyed
    }

    /// Whether the surface has been torn down.
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Draw a marker and wire its click handler to a new popup.
    ///
    /// A marker whose popup or handler fails is removed again, so a
    /// marker is only ever live with its popup attached.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::NotReady`] without a live map, or
    /// [`SurfaceError::Init`] carrying the backend failure.
    pub fn add_marker(
        &mut self,
        spec: &MarkerSpec,
        popup: &PopupContent,
    ) -> Result<MarkerHandle, SurfaceError> {
        let map = self.live_map()?;
        let marker = self.backend.create_marker(map, spec)?;

        let wired = self
            .backend
            .create_popup(popup)
            .and_then(|handle| self.backend.attach_click_handler(marker, handle));
        if let Err(e) = wired {
            if let Err(cleanup) = self.backend.destroy_marker(marker) {
                warn!(%marker, error = %cleanup, "failed to remove half-built marker");
            }
            return Err(e.into());
        }

        self.markers.insert(marker);
        Ok(marker)
    }

    /// Remove a live marker. Removing an unknown marker is a no-op.
    pub fn remove_marker(&mut self, marker: MarkerHandle) {
        if !self.markers.remove(&marker) {
            return;
        }
        if let Err(e) = self.backend.destroy_marker(marker) {
            warn!(%marker, error = %e, "backend failed to destroy marker");
        }
    }

    /// Whether `marker` is currently drawn.
    pub fn is_live(&self, marker: MarkerHandle) -> bool {
        self.markers.contains(&marker)
    }

    /// Number of markers currently drawn.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Fit the viewport to the smallest rectangle containing `points`.
    ///
    /// # Errors
    ///
    /// - [`SurfaceError::EmptyBounds`] for an empty slice.
    /// - [`SurfaceError::NotReady`] without a live map.
    /// - [`SurfaceError::Init`] if the backend refuses.
    pub fn fit_bounds(&mut self, points: &[Coordinate]) -> Result<Bounds, SurfaceError> {
        let bounds = Bounds::enclosing(points).ok_or(SurfaceError::EmptyBounds)?;
        let map = self.live_map()?;
        self.backend.fit_bounds(map, &bounds)?;
        debug!(%map, points = points.len(), "viewport fitted");
        Ok(bounds)
    }

    /// Remove every marker and destroy the map. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        let markers = core::mem::take(&mut self.markers);
        for marker in markers {
            if let Err(e) = self.backend.destroy_marker(marker) {
                debug!(%marker, error = %e, "marker teardown failed");
            }
        }
        if let Some(map) = self.map.take() {
            if let Err(e) = self.backend.destroy_map(map) {
                debug!(%map, error = %e, "map teardown failed");
            }
            info!(%map, "map surface destroyed");
        }
    }

    /// The wrapped backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    fn live_map(&self) -> Result<MapHandle, SurfaceError> {
        if self.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        self.map.ok_or(SurfaceError::NotReady)
    }
}

impl<B: MapBackend> Drop for MapSurface<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use vibemap_types::{Emotion, PlaceId};

    use super::*;

    /// Records calls and fails on request.
    #[derive(Debug, Default)]
    struct FakeBackend {
        next: u64,
        fail_map: bool,
        fail_popup: bool,
        destroyed_markers: Vec<MarkerHandle>,
        destroyed_maps: Vec<MapHandle>,
        fitted: Vec<Bounds>,
    }

    impl FakeBackend {
        fn next(&mut self) -> u64 {
            self.next += 1;
            self.next
        }
    }

    impl MapBackend for FakeBackend {
        fn create_map(&mut self, _: &str, _: &MapOptions) -> Result<MapHandle, BackendError> {
            if self.fail_map {
                return Err(BackendError::Rejected(String::from("no webgl")));
            }
            Ok(MapHandle(self.next()))
        }

        fn destroy_map(&mut self, map: MapHandle) -> Result<(), BackendError> {
            self.destroyed_maps.push(map);
            Ok(())
        }

        fn create_marker(&mut self, _: MapHandle, _: &MarkerSpec) -> Result<MarkerHandle, BackendError> {
            Ok(MarkerHandle(self.next()))
        }

        fn destroy_marker(&mut self, marker: MarkerHandle) -> Result<(), BackendError> {
            self.destroyed_markers.push(marker);
            Ok(())
        }

        fn create_popup(&mut self, _: &PopupContent) -> Result<PopupHandle, BackendError> {
            if self.fail_popup {
                return Err(BackendError::Rejected(String::from("popup")));
            }
            Ok(PopupHandle(self.next()))
        }

        fn attach_click_handler(&mut self, _: MarkerHandle, _: PopupHandle) -> Result<(), BackendError> {
            Ok(())
        }

        fn fit_bounds(&mut self, _: MapHandle, bounds: &Bounds) -> Result<(), BackendError> {
            self.fitted.push(*bounds);
            Ok(())
        }
    }

    fn options() -> MapOptions {
        MapOptions {
            center: Coordinate::new(37.7749, -122.4194),
            zoom: 12,
            styles: Vec::new(),
        }
    }

    fn spec(id: &str) -> (MarkerSpec, PopupContent) {
        let spec = MarkerSpec {
            place_id: PlaceId::new(id),
            position: Coordinate::new(37.0, -122.0),
            size: 10.0,
            color: String::from("#FFD700"),
            title: id.to_owned(),
        };
        let popup = PopupContent {
            place_id: PlaceId::new(id),
            name: id.to_owned(),
            emotion: Emotion::from("happy"),
            emotion_label: String::from("Happy"),
            rating: 4.0,
            intensity_percent: 50,
        };
        (spec, popup)
    }

    #[test]
    fn create_is_idempotent() {
        let mut surface = MapSurface::new(FakeBackend::default(), "vibe-heatmap");
        let first = surface.create(&options()).unwrap();
        let second = surface.create(&options()).unwrap();
        assert_eq!(first, second);
        assert!(surface.is_ready());
    }

    #[test]
    fn blank_container_is_rejected() {
        let mut surface = MapSurface::new(FakeBackend::default(), "  ");
        assert_eq!(surface.create(&options()), Err(SurfaceError::MissingContainer));
    }

    #[test]
    fn backend_init_failure_is_surfaced() {
        let backend = FakeBackend {
            fail_map: true,
            ..FakeBackend::default()
        };
        let mut surface = MapSurface::new(backend, "vibe-heatmap");
        assert!(matches!(surface.create(&options()), Err(SurfaceError::Init(_))));
        assert!(!surface.is_ready());
    }

    #[test]
    fn markers_need_a_map() {
        let mut surface = MapSurface::new(FakeBackend::default(), "vibe-heatmap");
        let (s, p) = spec("a");
        assert_eq!(surface.add_marker(&s, &p), Err(SurfaceError::NotReady));
    }

    #[test]
    fn failed_popup_rolls_back_marker() {
        let backend = FakeBackend {
            fail_popup: true,
            ..FakeBackend::default()
        };
        let mut surface = MapSurface::new(backend, "vibe-heatmap");
        surface.create(&options()).unwrap();
        let (s, p) = spec("a");
        assert!(surface.add_marker(&s, &p).is_err());
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.backend().destroyed_markers.len(), 1);
    }

    #[test]
    fn remove_unknown_marker_is_noop() {
        let mut surface = MapSurface::new(FakeBackend::default(), "vibe-heatmap");
        surface.create(&options()).unwrap();
        surface.remove_marker(MarkerHandle(999));
        assert!(surface.backend().destroyed_markers.is_empty());
    }

    #[test]
    fn fit_bounds_rejects_empty_set() {
        let mut surface = MapSurface::new(FakeBackend::default(), "vibe-heatmap");
        surface.create(&options()).unwrap();
        assert_eq!(surface.fit_bounds(&[]), Err(SurfaceError::EmptyBounds));
        assert!(surface.backend().fitted.is_empty());
    }

    #[test]
    fn destroy_removes_everything_once() {
        let mut surface = MapSurface::new(FakeBackend::default(), "vibe-heatmap");
        surface.create(&options()).unwrap();
        for id in ["a", "b", "c"] {
            let (s, p) = spec(id);
            surface.add_marker(&s, &p).unwrap();
        }
        surface.destroy();
        surface.destroy();
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.backend().destroyed_markers.len(), 3);
        assert_eq!(surface.backend().destroyed_maps.len(), 1);
        assert_eq!(surface.create(&options()), Err(SurfaceError::Destroyed));
    }
}
