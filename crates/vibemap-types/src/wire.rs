//! JSON protocol spoken with a browser map client over a `WebSocket`.
//!
//! The server owns all view state. It drives the client's mapping
//! library with [`MapCommand`]s and reports [`ViewStatus`] changes; the
//! client only sends [`ClientFrame`]s describing user input.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::emotion::FilterState;
use crate::ids::{MapHandle, MarkerHandle, PopupHandle};
use crate::map::{MapOptions, MarkerSpec, PopupContent};
use crate::place::Bounds;

/// An imperative instruction for the client-side mapping library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MapCommand {
    /// Construct a map inside the container element.
    CreateMap {
        /// Handle the server will use to refer to this map.
        map: MapHandle,
        /// DOM element id of the container.
        container_id: String,
        /// Construction options.
        options: MapOptions,
    },
    /// Tear down a map and everything attached to it.
    DestroyMap {
        /// The map to destroy.
        map: MapHandle,
    },
    /// Add a marker to a map.
    CreateMarker {
        /// Handle of the new marker.
        marker: MarkerHandle,
        /// The map that owns the marker.
        map: MapHandle,
        /// What to draw.
        spec: MarkerSpec,
    },
    /// Remove a marker and its click handler.
    DestroyMarker {
        /// The marker to remove.
        marker: MarkerHandle,
    },
    /// Build (but do not open) a detail popup.
    CreatePopup {
        /// Handle of the new popup.
        popup: PopupHandle,
        /// Popup body.
        content: PopupContent,
    },
    /// Open `popup` anchored at `marker` when the marker is clicked.
    AttachClickHandler {
        /// The clickable marker.
        marker: MarkerHandle,
        /// The popup to open.
        popup: PopupHandle,
    },
    /// Move the viewport so the rectangle is fully visible.
    FitBounds {
        /// The map whose viewport changes.
        map: MapHandle,
        /// Rectangle to fit.
        bounds: Bounds,
    },
}

/// User-visible status of a mounted view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ViewStatus {
    /// Waiting on the mapping library and/or a dataset.
    Loading,
    /// Markers are synchronized with the current dataset and filter.
    Ready {
        /// Location the dataset was fetched for.
        location: String,
        /// Number of markers currently on the map.
        visible: u32,
        /// Number of places in the dataset before filtering.
        total: u32,
    },
    /// Something failed; the view stays mounted.
    Error {
        /// Human-readable description.
        message: String,
    },
}

/// Frame sent from the server to a live view client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerFrame {
    /// A mapping-library instruction.
    Command(MapCommand),
    /// A status change.
    Status(ViewStatus),
}

/// Frame sent from a live view client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientFrame {
    /// Request the dataset for a location.
    SetLocation {
        /// Location key, matched exactly against the store.
        location: String,
    },
    /// Change the emotion filter.
    SetFilter {
        /// `all` or an emotion key.
        #[ts(type = "string")]
        filter: FilterState,
    },
}
