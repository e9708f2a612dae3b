//! Marker synchronizer: reconciles the live marker set with a filtered
//! place set.
//!
//! The synchronizer diffs instead of redrawing. A marker survives a sync
//! only if its place is still targeted and every derived attribute
//! (position, size, color, popup) is unchanged; anything else is
//! destroyed and redrawn. After a sync the live marker ids are exactly
//! the distinct ids of the target set, minus any place whose marker
//! failed to draw.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};
use vibemap_types::{Bounds, MarkerHandle, MarkerSpec, Place, PlaceId, PopupContent};

use crate::config::MarkerConfig;
use crate::error::{MarkerCreateError, SurfaceError};
use crate::surface::{MapBackend, MapSurface};

/// Derive the marker and popup for a place.
///
/// Size is `base_size + intensity * scale_factor` with intensity clamped
/// to `[0, 1]`; color comes from the palette keyed by dominant emotion.
pub fn marker_for(place: &Place, style: &MarkerConfig) -> (MarkerSpec, PopupContent) {
    let intensity = place.dominant_intensity().clamp(0.0, 1.0);
    let spec = MarkerSpec {
        place_id: place.id.clone(),
        position: place.coordinate,
        size: intensity.mul_add(style.scale_factor, style.base_size),
        color: style.color_for(&place.dominant_emotion).to_owned(),
        title: place.name.clone(),
    };
    let popup = PopupContent {
        place_id: place.id.clone(),
        name: place.name.clone(),
        emotion: place.dominant_emotion.clone(),
        emotion_label: place.dominant_emotion.label(),
        rating: place.rating,
        intensity_percent: intensity_percent(intensity),
    };
    (spec, popup)
}

/// `round(intensity * 100)` for an intensity already clamped to `[0, 1]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn intensity_percent(intensity: f64) -> u8 {
    (intensity * 100.0).round().clamp(0.0, 100.0) as u8
}

/// A marker the synchronizer has drawn.
#[derive(Debug, Clone, PartialEq)]
struct RenderedMarker {
    handle: MarkerHandle,
    spec: MarkerSpec,
    popup: PopupContent,
}

/// What one sync did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Markers newly drawn.
    pub created: usize,
    /// Markers kept from the previous sync.
    pub retained: usize,
    /// Markers destroyed.
    pub removed: usize,
    /// Places whose marker could not be drawn.
    pub failures: Vec<MarkerCreateError>,
    /// The rectangle the viewport was fitted to, if any.
    pub fitted: Option<Bounds>,
}

impl SyncReport {
    /// Number of markers live after the sync.
    pub const fn live(&self) -> usize {
        self.created.saturating_add(self.retained)
    }
}

/// Owns the bookkeeping between places and their markers on one surface.
#[derive(Debug, Clone)]
pub struct MarkerSynchronizer {
    style: MarkerConfig,
    rendered: BTreeMap<PlaceId, RenderedMarker>,
}

impl MarkerSynchronizer {
    /// Create a synchronizer drawing markers with `style`.
    pub const fn new(style: MarkerConfig) -> Self {
        Self {
            style,
            rendered: BTreeMap::new(),
        }
    }

    /// The marker style in use.
    pub const fn style(&self) -> &MarkerConfig {
        &self.style
    }

    /// Number of markers the synchronizer believes are drawn.
    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }

    /// Ids of places that currently have a marker.
    pub fn rendered_ids(&self) -> BTreeSet<PlaceId> {
        self.rendered.keys().cloned().collect()
    }

    /// Make the markers on `surface` match `places`.
    ///
    /// Duplicate ids keep the first occurrence. An empty `places`
    /// removes every marker and leaves the viewport untouched. Marker
    /// failures are collected in the report and do not abort the rest.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::NotReady`] or [`SurfaceError::Destroyed`]
    /// when the surface cannot take markers. Nothing is changed.
    pub fn sync<B: MapBackend>(
        &mut self,
        surface: &mut MapSurface<B>,
        places: &[Place],
    ) -> Result<SyncReport, SurfaceError> {
        if surface.is_destroyed() {
            self.rendered.clear();
            return Err(SurfaceError::Destroyed);
        }
        if !surface.is_ready() {
            return Err(SurfaceError::NotReady);
        }

        self.rendered.retain(|_, marker| surface.is_live(marker.handle));

        let mut seen = BTreeSet::new();
        let mut targets = Vec::with_capacity(places.len());
        for place in places {
            if seen.insert(&place.id) {
                targets.push((place, marker_for(place, &self.style)));
            } else {
                warn!(place_id = %place.id, "duplicate place id in dataset, keeping first");
            }
        }

        let mut report = SyncReport::default();

        let wanted: BTreeMap<&PlaceId, &(MarkerSpec, PopupContent)> = targets
            .iter()
            .map(|(place, derived)| (&place.id, derived))
            .collect();
        let stale: Vec<PlaceId> = self
            .rendered
            .iter()
            .filter(|(id, marker)| {
                wanted
                    .get(id)
                    .is_none_or(|(spec, popup)| marker.spec != *spec || marker.popup != *popup)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            if let Some(marker) = self.rendered.remove(&id) {
                surface.remove_marker(marker.handle);
                report.removed = report.removed.saturating_add(1);
            }
        }

        let mut shown = Vec::with_capacity(targets.len());
        for (place, (spec, popup)) in targets {
            if self.rendered.contains_key(&place.id) {
                report.retained = report.retained.saturating_add(1);
                shown.push(place.coordinate);
                continue;
            }
            match surface.add_marker(&spec, &popup) {
                Ok(handle) => {
                    self.rendered
                        .insert(place.id.clone(), RenderedMarker { handle, spec, popup });
                    report.created = report.created.saturating_add(1);
                    shown.push(place.coordinate);
                }
                Err(SurfaceError::Init(source)) => {
                    let failure = MarkerCreateError {
                        place_id: place.id.clone(),
                        source,
                    };
                    warn!(error = %failure, "marker skipped");
                    report.failures.push(failure);
                }
                Err(e) => return Err(e),
            }
        }

        if !shown.is_empty() {
            report.fitted = Some(surface.fit_bounds(&shown)?);
        }

        debug!(
            created = report.created,
            retained = report.retained,
            removed = report.removed,
            failed = report.failures.len(),
            "markers synchronized"
        );
        Ok(report)
    }

    /// Remove every marker from `surface`, keeping the viewport.
    pub fn clear<B: MapBackend>(&mut self, surface: &mut MapSurface<B>) -> usize {
        let removed = self.rendered.len();
        for (_, marker) in core::mem::take(&mut self.rendered) {
            surface.remove_marker(marker.handle);
        }
        removed
    }

    /// Forget all bookkeeping without touching a surface. Used after the
    /// surface itself was destroyed.
    pub fn reset(&mut self) {
        self.rendered.clear();
    }
}
