//! REST response bodies served by the heatmap API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::emotion::{Emotion, EmotionScores, FilterState};
use crate::ids::PlaceId;
use crate::place::Place;

/// Body of `GET /api/heatmap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HeatmapResponse {
    /// Location key the places were fetched for.
    pub location: String,
    /// Filter applied to the dataset.
    #[ts(type = "string")]
    pub filter: FilterState,
    /// Places passing the filter, in store order.
    pub places: Vec<Place>,
    /// Number of entries in `places`.
    pub total_places: usize,
    /// When the response was assembled.
    pub generated_at: DateTime<Utc>,
}

/// Body of `GET /api/places/{id}/emotions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlaceEmotionsResponse {
    /// The place.
    pub place_id: PlaceId,
    /// Normalized emotion intensities.
    pub emotions: EmotionScores,
    /// Dominant emotion after normalization.
    pub dominant_emotion: Emotion,
}
