//! Error types for the view synchronization engine.
//!
//! Four failure families reach a mounted view: the mapping script
//! failing to load ([`ScriptLoadError`]), the map failing to construct
//! after the script loaded ([`SurfaceError`]), a dataset fetch failing
//! ([`FetchError`]), and an individual marker failing to draw
//! ([`MarkerCreateError`]). None of them are fatal; the view engine
//! folds them into a user-visible status.

use vibemap_types::PlaceId;

/// The mapping script could not be loaded.
///
/// Cloneable because a single load outcome is shared by every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptLoadError {
    /// No API key is configured.
    #[error("mapping API key is not configured (set {})", crate::config::MAPS_API_KEY_ENV)]
    MissingApiKey,

    /// The HTTP request could not be completed.
    #[error("script request failed: {0}")]
    Request(String),

    /// The script host answered with a non-success status.
    #[error("script host returned HTTP {0}")]
    Status(u16),

    /// The script body was empty.
    #[error("script body was empty")]
    EmptyBody,

    /// The load task died before producing an outcome.
    #[error("script load aborted: {0}")]
    Aborted(String),
}

/// A map backend rejected an operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The client that renders the map is gone.
    #[error("map client disconnected")]
    Disconnected,

    /// A marker position is outside geographic bounds.
    #[error("invalid marker position ({lat}, {lng})")]
    InvalidPosition {
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lng: f64,
    },

    /// The handle does not belong to this backend.
    #[error("unknown handle: {0}")]
    UnknownHandle(String),

    /// Any other backend-specific refusal.
    #[error("backend rejected operation: {0}")]
    Rejected(String),
}

/// Errors from [`MapSurface`](crate::surface::MapSurface) lifecycle operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    /// No container id was supplied for the map.
    #[error("map container is missing")]
    MissingContainer,

    /// The surface was already destroyed and cannot be reused.
    #[error("map surface has been destroyed")]
    Destroyed,

    /// An operation needed a map but none has been created.
    #[error("map surface is not ready")]
    NotReady,

    /// `fit_bounds` was called with no coordinates.
    #[error("cannot fit bounds of an empty coordinate set")]
    EmptyBounds,

    /// The backend failed to construct the map.
    #[error("map construction failed: {0}")]
    Init(#[from] BackendError),
}

/// A single marker could not be created during synchronization.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("marker for place {place_id} could not be created: {source}")]
pub struct MarkerCreateError {
    /// The place whose marker failed.
    pub place_id: PlaceId,
    /// The backend failure.
    pub source: BackendError,
}

/// The place store failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("place store unavailable: {0}")]
    Unavailable(String),

    /// A query was rejected or failed mid-flight.
    #[error("place query failed: {0}")]
    Query(String),

    /// A seed file could not be read.
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    /// A seed file or stored document was not valid JSON.
    #[error("invalid place document JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A dataset fetch for a location failed.
#[derive(Debug, thiserror::Error)]
#[error("fetching places for {location_key:?} failed: {source}")]
pub struct FetchError {
    /// The location that was requested.
    pub location_key: String,
    /// The underlying store failure.
    #[source]
    pub source: StoreError,
}
