//! REST API endpoint handlers for the heatmap server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/heatmap` | Filtered places for a location |
//! | `GET` | `/api/places/{id}/emotions` | Emotion profile of one place |
//! | `GET` | `/api/map/config` | Map bootstrap settings for the browser |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use chrono::Utc;
use serde::Serialize;
use vibemap_core::filter;
use vibemap_types::{
    Coordinate, Emotion, FilterState, HeatmapResponse, MapStyleRule, PlaceEmotionsResponse, PlaceId,
};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/heatmap` endpoint.
#[derive(Debug, Default, serde::Deserialize)]
pub struct HeatmapQuery {
    /// Location key; defaults to the configured default location.
    pub location: Option<String>,
    /// `all` or an emotion key; defaults to `all`.
    pub emotion: Option<String>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.source.store().kind();
    let script = match state.loader().outcome() {
        None => String::from("pending"),
        Some(Ok(())) => String::from("ready"),
        Some(Err(e)) => format!("failed ({e})"),
    };
    let location = &state.config.places.default_location;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Vibemap</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #ff69b4; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Vibemap</h1>
    <p class="subtitle">Emotional heatmap server</p>
    <p>Place store: <b>{store}</b></p>
    <p>Mapping script: <b>{script}</b></p>
    <ul>
        <li><a href="/api/heatmap">/api/heatmap?location={location}&amp;emotion=all</a></li>
        <li>/api/places/{{id}}/emotions</li>
        <li><a href="/api/map/config">/api/map/config</a></li>
        <li>/ws/view (WebSocket)</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/heatmap -- filtered places for a location
// ---------------------------------------------------------------------------

/// Return the places for a location that pass the emotion filter.
///
/// Responds 404 when no place passes, 400 for an unknown emotion, and
/// 502 when the store fails.
pub async fn heatmap(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<HeatmapResponse>, ApiError> {
    let location = query
        .location
        .map(|l| l.trim().to_owned())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| state.config.places.default_location.clone());

    let filter = FilterState::parse(query.emotion.as_deref().unwrap_or_default());
    let unknown = matches!(
        &filter,
        FilterState::Only(emotion)
            if !emotion.is_known() && !state.config.markers.colors.contains_key(emotion)
    );
    if unknown {
        return Err(ApiError::InvalidQuery(format!("unknown emotion \"{filter}\"")));
    }

    let places = state.source.fetch_untagged(&location).await?;
    let visible = filter::apply(&places, &filter);
    if visible.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no places found for {location} ({filter})"
        )));
    }

    tracing::debug!(%location, %filter, total = places.len(), visible = visible.len(), "heatmap served");

    Ok(Json(HeatmapResponse {
        location,
        filter,
        total_places: visible.len(),
        places: visible,
        generated_at: Utc::now(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/places/{id}/emotions -- emotion profile of one place
// ---------------------------------------------------------------------------

/// Return the normalized emotion scores and dominant emotion of a place.
pub async fn place_emotions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PlaceEmotionsResponse>, ApiError> {
    let place_id = PlaceId::new(id);
    let place = state
        .source
        .place(&place_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("place {place_id}")))?;

    Ok(Json(PlaceEmotionsResponse {
        place_id: place.id,
        emotions: place.emotion_scores,
        dominant_emotion: place.dominant_emotion,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/map/config -- map bootstrap settings
// ---------------------------------------------------------------------------

/// Settings a browser client needs to mount a map view.
#[derive(Debug, Clone, Serialize)]
pub struct MapBootstrap {
    /// DOM element id the map is mounted into.
    pub container_id: String,
    /// Keyed mapping script URL, absent when no API key is configured.
    pub script_url: Option<String>,
    /// Initial viewport center.
    pub center: Coordinate,
    /// Initial zoom level.
    pub zoom: u8,
    /// Styling rules passed to the mapping library.
    pub styles: Vec<MapStyleRule>,
    /// Emotion key to marker color.
    pub colors: BTreeMap<Emotion, String>,
    /// Color for emotions without a palette entry.
    pub fallback_color: String,
    /// Location shown when none is chosen.
    pub default_location: String,
}

/// Return the map bootstrap settings.
pub async fn map_config(State(state): State<Arc<AppState>>) -> Json<MapBootstrap> {
    let map = &state.config.map;
    let markers = &state.config.markers;
    Json(MapBootstrap {
        container_id: map.container_id.clone(),
        script_url: map.keyed_script_url(),
        center: map.default_center,
        zoom: map.default_zoom,
        styles: map.styles.clone(),
        colors: markers.colors.clone(),
        fallback_color: markers.fallback_color.clone(),
        default_location: state.config.places.default_location.clone(),
    })
}
