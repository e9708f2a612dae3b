//! Place store abstraction and the in-memory implementation.
//!
//! A place store holds raw place documents in a named collection and
//! answers exact-match queries on the document's `city` field. The
//! documents are returned untouched; normalization happens in
//! [`crate::source`].

use std::future::Future;
use std::path::Path;

use serde_json::Value;
use tokio::sync::RwLock;
use vibemap_types::PlaceId;

use crate::error::StoreError;

/// A place document as stored, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPlace {
    /// Document identifier.
    pub id: String,
    /// The document body (`name`, `location`, `emotions`, ...).
    pub document: Value,
}

impl RawPlace {
    /// Create a raw place from an id and document body.
    pub fn new(id: impl Into<String>, document: Value) -> Self {
        Self {
            id: id.into(),
            document,
        }
    }

    /// The `city` field of the document, if it is a string.
    pub fn city(&self) -> Option<&str> {
        self.document.get("city").and_then(Value::as_str)
    }
}

/// A queryable collection of place documents.
pub trait PlaceStore: Send + Sync + 'static {
    /// All documents whose `city` equals `location_key` exactly
    /// (case-sensitive), in store order.
    fn places_in(
        &self,
        location_key: &str,
    ) -> impl Future<Output = Result<Vec<RawPlace>, StoreError>> + Send;

    /// A single document by id.
    fn place_by_id(
        &self,
        id: &PlaceId,
    ) -> impl Future<Output = Result<Option<RawPlace>, StoreError>> + Send;
}

/// A place store held in process memory.
///
/// Used when no database is configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryPlaceStore {
    places: RwLock<Vec<RawPlace>>,
}

impl MemoryPlaceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `places` in the given order.
    pub fn with_places(places: Vec<RawPlace>) -> Self {
        Self {
            places: RwLock::new(places),
        }
    }

    /// Build a store from a JSON array of documents.
    ///
    /// Each document's `id` field (string or number) becomes its id;
    /// documents without one get `place-{index}`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Json`] if the text is not JSON, or
    /// [`StoreError::Query`] if it is not an array.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(documents) = value else {
            return Err(StoreError::Query(String::from(
                "seed document must be a JSON array",
            )));
        };
        let places = documents
            .into_iter()
            .enumerate()
            .map(|(index, document)| {
                let id = match document.get("id") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => format!("place-{index}"),
                };
                RawPlace::new(id, document)
            })
            .collect();
        Ok(Self::with_places(places))
    }

    /// Build a store from a JSON seed file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, or any
    /// error from [`MemoryPlaceStore::from_json`].
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        let store = Self::from_json(&contents)?;
        tracing::info!(path = %path.display(), "loaded place seed file");
        Ok(store)
    }

    /// Insert a document, replacing any document with the same id.
    pub async fn insert(&self, place: RawPlace) {
        let mut places = self.places.write().await;
        if let Some(existing) = places.iter_mut().find(|p| p.id == place.id) {
            *existing = place;
        } else {
            places.push(place);
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.places.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.places.read().await.is_empty()
    }

    /// Copy of every stored document, in insertion order.
    pub async fn snapshot(&self) -> Vec<RawPlace> {
        self.places.read().await.clone()
    }
}

impl PlaceStore for MemoryPlaceStore {
    async fn places_in(&self, location_key: &str) -> Result<Vec<RawPlace>, StoreError> {
        let places = self.places.read().await;
        Ok(places
            .iter()
            .filter(|p| p.city() == Some(location_key))
            .cloned()
            .collect())
    }

    async fn place_by_id(&self, id: &PlaceId) -> Result<Option<RawPlace>, StoreError> {
        let places = self.places.read().await;
        Ok(places.iter().find(|p| p.id == id.as_str()).cloned())
    }
}
