//! Map construction options and the descriptors handed to a map backend.
//!
//! Styling rules are passed through to the mapping library verbatim; the
//! engine never interprets them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::emotion::Emotion;
use crate::ids::PlaceId;
use crate::place::Coordinate;

/// One declarative map styling rule (`{featureType, elementType, stylers}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MapStyleRule {
    /// Feature selector, e.g. `poi` or `water`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_type: Option<String>,
    /// Element selector, e.g. `geometry` or `labels.text.fill`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// Opaque styler objects.
    #[serde(default)]
    pub stylers: Vec<serde_json::Value>,
}

/// Options used when a map instance is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapOptions {
    /// Initial viewport center.
    pub center: Coordinate,
    /// Initial zoom level.
    pub zoom: u8,
    /// Styling rules passed through to the mapping library.
    pub styles: Vec<MapStyleRule>,
}

/// Everything a backend needs to draw one place marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarkerSpec {
    /// The place this marker represents.
    pub place_id: PlaceId,
    /// Marker position.
    pub position: Coordinate,
    /// Marker radius/scale in screen units.
    pub size: f64,
    /// Fill color as a CSS hex string.
    pub color: String,
    /// Hover title (the place name).
    pub title: String,
}

/// Content of the detail popup opened when a marker is clicked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PopupContent {
    /// The place the popup describes.
    pub place_id: PlaceId,
    /// Place name.
    pub name: String,
    /// Dominant emotion key.
    pub emotion: Emotion,
    /// Display label of the dominant emotion.
    pub emotion_label: String,
    /// Place rating in `[0, 5]`.
    pub rating: f64,
    /// Dominant intensity as a rounded percentage.
    pub intensity_percent: u8,
}
