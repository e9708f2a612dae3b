//! Data source: location-keyed dataset fetches with stale-response rejection.
//!
//! Every fetch is tagged with a [`FetchTicket`] carrying a sequence
//! number from a counter shared by all clones of one [`DataSource`].
//! When a fetch resolves after a newer fetch was issued, its result is
//! reported as [`FetchOutcome::Stale`] and must not be displayed.
//!
//! Raw documents are normalized one by one. A document with an unusable
//! coordinate is kept and placed at the configured fallback coordinate
//! rather than dropped, so a partially bad dataset still renders.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, warn};
use vibemap_types::{Coordinate, Emotion, EmotionScores, Place, PlaceId};

use crate::config::PlacesConfig;
use crate::error::FetchError;
use crate::store::{PlaceStore, RawPlace};

/// Name given to documents without one.
const UNNAMED_PLACE: &str = "Unnamed place";

/// Upper bound of the rating scale.
const MAX_RATING: f64 = 5.0;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Turns raw store documents into [`Place`]s with safe defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    default_emotion: Emotion,
    fallback_coordinate: Coordinate,
}

impl Normalizer {
    /// Create a normalizer with explicit defaults.
    pub const fn new(default_emotion: Emotion, fallback_coordinate: Coordinate) -> Self {
        Self {
            default_emotion,
            fallback_coordinate,
        }
    }

    /// Create a normalizer from the places configuration.
    pub fn from_config(config: &PlacesConfig) -> Self {
        Self::new(config.default_emotion.clone(), config.fallback_coordinate)
    }

    /// The dominant emotion assigned when no usable score exists.
    pub const fn default_emotion(&self) -> &Emotion {
        &self.default_emotion
    }

    /// Normalize one document fetched under `location_key`.
    pub fn normalize(&self, raw: &RawPlace, location_key: &str) -> Place {
        let doc = &raw.document;

        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNNAMED_PLACE)
            .to_owned();

        let coordinate = read_coordinate(doc).unwrap_or_else(|| {
            warn!(
                place_id = %raw.id,
                location_key,
                "place has no usable coordinate, using fallback"
            );
            self.fallback_coordinate
        });

        let emotion_scores = read_scores(doc);
        let dominant_emotion = self.dominant(doc, &emotion_scores);

        let rating = doc
            .get("rating")
            .and_then(Value::as_f64)
            .filter(|r| r.is_finite())
            .map_or(0.0, |r| r.clamp(0.0, MAX_RATING));

        let category_tags = doc
            .get("types")
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Place {
            id: PlaceId::new(raw.id.clone()),
            name,
            coordinate,
            emotion_scores,
            dominant_emotion,
            rating,
            category_tags,
            location_key: location_key.to_owned(),
        }
    }

    /// The stored dominant emotion if it is a scored key, otherwise the
    /// argmax of the scores, otherwise the default.
    fn dominant(&self, doc: &Value, scores: &EmotionScores) -> Emotion {
        let stored = doc
            .get("dominant_emotion")
            .and_then(Value::as_str)
            .map(Emotion::from);
        match stored {
            Some(emotion) if scores.contains_key(&emotion) => emotion,
            _ => Emotion::dominant_in(scores)
                .cloned()
                .unwrap_or_else(|| self.default_emotion.clone()),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&PlacesConfig::default())
    }
}

/// Read `location {lat,lng}` or `location {latitude,longitude}`.
fn read_coordinate(doc: &Value) -> Option<Coordinate> {
    let location = doc.get("location")?;
    let lat = location
        .get("lat")
        .or_else(|| location.get("latitude"))
        .and_then(Value::as_f64)?;
    let lng = location
        .get("lng")
        .or_else(|| location.get("longitude"))
        .and_then(Value::as_f64)?;
    Some(Coordinate::new(lat, lng)).filter(Coordinate::is_valid)
}

/// Read the `emotions` map, dropping non-numeric entries and clamping
/// intensities into `[0, 1]`.
fn read_scores(doc: &Value) -> EmotionScores {
    doc.get("emotions")
        .and_then(Value::as_object)
        .map(|emotions| {
            emotions
                .iter()
                .filter(|(key, _)| !key.is_empty())
                .filter_map(|(key, value)| {
                    value
                        .as_f64()
                        .filter(|v| v.is_finite())
                        .map(|v| (Emotion::new(key.clone()), v.clamp(0.0, 1.0)))
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tagged fetches
// ---------------------------------------------------------------------------

/// Identifies one issued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    /// Position in issue order; higher is newer.
    pub seq: u64,
    /// The requested location.
    pub location_key: String,
}

/// The resolution of a tagged fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The fetch was still the latest issued when it resolved.
    Current {
        /// The fetch this result belongs to.
        ticket: FetchTicket,
        /// Normalized places or the failure.
        result: Result<Vec<Place>, FetchError>,
    },
    /// A newer fetch was issued first; the result was discarded.
    Stale {
        /// The superseded fetch.
        ticket: FetchTicket,
    },
}

impl FetchOutcome {
    /// The ticket of the fetch that produced this outcome.
    pub const fn ticket(&self) -> &FetchTicket {
        match self {
            Self::Current { ticket, .. } | Self::Stale { ticket } => ticket,
        }
    }
}

/// Fetches and normalizes location datasets from a [`PlaceStore`].
///
/// Clones share the store, the normalizer and the issue counter, so a
/// clone handed to a spawned task still participates in stale detection.
/// Each view takes its own counter through [`DataSource::for_view`], so
/// one view's fetch never makes another view's fetch stale.
#[derive(Debug)]
pub struct DataSource<S> {
    store: Arc<S>,
    normalizer: Arc<Normalizer>,
    latest: Arc<AtomicU64>,
}

impl<S> Clone for DataSource<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            normalizer: Arc::clone(&self.normalizer),
            latest: Arc::clone(&self.latest),
        }
    }
}

impl<S: PlaceStore> DataSource<S> {
    /// Create a data source over `store`.
    pub fn new(store: Arc<S>, normalizer: Normalizer) -> Self {
        Self {
            store,
            normalizer: Arc::new(normalizer),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A source over the same store and normalizer with its own issue
    /// counter. Stale detection is scoped to the returned source and its
    /// clones.
    pub fn for_view(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            normalizer: Arc::clone(&self.normalizer),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The normalizer applied to every document.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Issue a fetch for `location_key`.
    ///
    /// The ticket is assigned immediately, so issue order is call order
    /// regardless of when the returned future is polled.
    pub fn fetch(&self, location_key: &str) -> (FetchTicket, BoxFuture<'static, FetchOutcome>) {
        let seq = self.latest.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let ticket = FetchTicket {
            seq,
            location_key: location_key.to_owned(),
        };
        debug!(seq, location_key, "issuing place fetch");

        let source = self.clone();
        let tag = ticket.clone();
        let future = async move {
            let result = source.fetch_untagged(&tag.location_key).await;
            if source.is_latest(&tag) {
                FetchOutcome::Current { ticket: tag, result }
            } else {
                debug!(
                    seq = tag.seq,
                    location_key = %tag.location_key,
                    "discarding stale place fetch"
                );
                FetchOutcome::Stale { ticket: tag }
            }
        }
        .boxed();

        (ticket, future)
    }

    /// Whether `ticket` is the most recently issued fetch.
    pub fn is_latest(&self, ticket: &FetchTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.seq
    }

    /// Fetch and normalize without tagging. Used by one-shot requests
    /// that have no view state to protect.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the store query fails.
    pub async fn fetch_untagged(&self, location_key: &str) -> Result<Vec<Place>, FetchError> {
        let raw = self
            .store
            .places_in(location_key)
            .await
            .map_err(|source| FetchError {
                location_key: location_key.to_owned(),
                source,
            })?;
        let places: Vec<Place> = raw
            .iter()
            .map(|doc| self.normalizer.normalize(doc, location_key))
            .collect();
        debug!(location_key, count = places.len(), "places fetched");
        Ok(places)
    }

    /// Fetch and normalize a single place by id.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the store query fails.
    pub async fn place(&self, id: &PlaceId) -> Result<Option<Place>, FetchError> {
        let raw = self.store.place_by_id(id).await.map_err(|source| FetchError {
            location_key: String::new(),
            source,
        })?;
        Ok(raw.map(|doc| {
            let key = doc.city().unwrap_or_default().to_owned();
            self.normalizer.normalize(&doc, &key)
        }))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryPlaceStore;

    fn normalizer() -> Normalizer {
        Normalizer::new(Emotion::from("happy"), Coordinate::new(1.0, 2.0))
    }

    #[test]
    fn normalizes_complete_document() {
        let raw = RawPlace::new(
            "p1",
            json!({
                "name": "The Daily Bean",
                "location": {"lat": 37.77, "lng": -122.42},
                "emotions": {"happy": 0.9, "relaxed": 0.4},
                "dominant_emotion": "happy",
                "rating": 4.5,
                "types": ["cafe", "bakery"],
                "city": "San Francisco, CA"
            }),
        );
        let place = normalizer().normalize(&raw, "San Francisco, CA");
        assert_eq!(place.id, PlaceId::new("p1"));
        assert_eq!(place.name, "The Daily Bean");
        assert_eq!(place.coordinate, Coordinate::new(37.77, -122.42));
        assert_eq!(place.dominant_emotion, Emotion::from("happy"));
        assert!((place.rating - 4.5).abs() < f64::EPSILON);
        assert_eq!(place.category_tags, ["cafe", "bakery"]);
        assert_eq!(place.location_key, "San Francisco, CA");
    }

    #[test]
    fn accepts_long_form_coordinates() {
        let raw = RawPlace::new(
            "p",
            json!({"location": {"latitude": 40.7, "longitude": -74.0}}),
        );
        assert_eq!(
            normalizer().normalize(&raw, "NYC").coordinate,
            Coordinate::new(40.7, -74.0)
        );
    }

    #[test]
    fn missing_or_invalid_coordinate_uses_fallback() {
        let n = normalizer();
        for doc in [
            json!({}),
            json!({"location": {"lat": "37"}}),
            json!({"location": {"lat": 120.0, "lng": 0.0}}),
        ] {
            let place = n.normalize(&RawPlace::new("p", doc), "X");
            assert_eq!(place.coordinate, Coordinate::new(1.0, 2.0));
        }
    }

    #[test]
    fn empty_document_gets_safe_defaults() {
        let place = normalizer().normalize(&RawPlace::new("p", json!({})), "X");
        assert_eq!(place.name, UNNAMED_PLACE);
        assert!(place.emotion_scores.is_empty());
        assert_eq!(place.dominant_emotion, Emotion::from("happy"));
        assert!(place.rating.abs() < f64::EPSILON);
        assert!(place.category_tags.is_empty());
    }

    #[test]
    fn stored_dominant_not_in_scores_is_recomputed() {
        let raw = RawPlace::new(
            "p",
            json!({"emotions": {"lonely": 0.4, "anxious": 0.6}, "dominant_emotion": "happy"}),
        );
        assert_eq!(
            normalizer().normalize(&raw, "X").dominant_emotion,
            Emotion::from("anxious")
        );
    }

    #[test]
    fn missing_dominant_is_argmax() {
        let raw = RawPlace::new("p", json!({"emotions": {"lonely": 0.4, "romantic": 0.8}}));
        assert_eq!(
            normalizer().normalize(&raw, "X").dominant_emotion,
            Emotion::from("romantic")
        );
    }

    #[test]
    fn valid_stored_dominant_is_kept() {
        let raw = RawPlace::new(
            "p",
            json!({"emotions": {"lonely": 0.4, "romantic": 0.8}, "dominant_emotion": "lonely"}),
        );
        assert_eq!(
            normalizer().normalize(&raw, "X").dominant_emotion,
            Emotion::from("lonely")
        );
    }

    #[test]
    fn scores_and_rating_are_clamped() {
        let raw = RawPlace::new(
            "p",
            json!({"emotions": {"happy": 1.7, "lonely": -0.2, "bad": "x"}, "rating": 9}),
        );
        let place = normalizer().normalize(&raw, "X");
        assert_eq!(place.emotion_scores.get(&Emotion::from("happy")), Some(&1.0));
        assert_eq!(place.emotion_scores.get(&Emotion::from("lonely")), Some(&0.0));
        assert!(!place.emotion_scores.contains_key(&Emotion::from("bad")));
        assert!((place.rating - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dominant_is_always_scored_or_default() {
        let n = normalizer();
        for doc in [
            json!({"dominant_emotion": "lonely"}),
            json!({"emotions": {}, "dominant_emotion": "x"}),
            json!({"emotions": {"relaxed": 0.1}, "dominant_emotion": 3}),
        ] {
            let place = n.normalize(&RawPlace::new("p", doc), "X");
            assert!(
                place.emotion_scores.contains_key(&place.dominant_emotion)
                    || place.dominant_emotion == *n.default_emotion()
            );
        }
    }

    #[tokio::test]
    async fn later_fetch_makes_earlier_stale() {
        let store = Arc::new(MemoryPlaceStore::with_places(vec![
            RawPlace::new("a1", json!({"city": "A"})),
            RawPlace::new("b1", json!({"city": "B"})),
        ]));
        let source = DataSource::new(store, normalizer());

        let (ticket_a, fetch_a) = source.fetch("A");
        let (ticket_b, fetch_b) = source.fetch("B");
        assert!(ticket_b.seq > ticket_a.seq);

        let outcome_b = fetch_b.await;
        let outcome_a = fetch_a.await;

        assert!(matches!(outcome_a, FetchOutcome::Stale { ref ticket } if *ticket == ticket_a));
        match outcome_b {
            FetchOutcome::Current { ticket, result } => {
                assert_eq!(ticket, ticket_b);
                let ids: Vec<String> = result
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| p.id.0)
                    .collect();
                assert_eq!(ids, ["b1"]);
            }
            FetchOutcome::Stale { .. } => panic!("latest fetch reported stale"),
        }
    }

    #[tokio::test]
    async fn view_sources_track_staleness_independently() {
        let store = Arc::new(MemoryPlaceStore::with_places(vec![
            RawPlace::new("a1", json!({"city": "A"})),
            RawPlace::new("b1", json!({"city": "B"})),
        ]));
        let shared = DataSource::new(store, normalizer());
        let view_a = shared.for_view();
        let view_b = shared.for_view();

        let (ticket_a, fetch_a) = view_a.fetch("A");
        let (_, fetch_b) = view_b.fetch("B");

        assert!(matches!(fetch_b.await, FetchOutcome::Current { .. }));
        assert!(matches!(fetch_a.await, FetchOutcome::Current { ref ticket, .. } if *ticket == ticket_a));
        assert!(view_a.is_latest(&ticket_a));
    }

    #[tokio::test]
    async fn place_by_id_normalizes_under_its_city() {
        let store = Arc::new(MemoryPlaceStore::with_places(vec![RawPlace::new(
            "p1",
            json!({"city": "Austin, TX", "emotions": {"energetic": 0.7}}),
        )]));
        let source = DataSource::new(store, normalizer());
        let place = source.place(&PlaceId::new("p1")).await.ok().flatten();
        assert_eq!(place.as_ref().map(|p| p.location_key.as_str()), Some("Austin, TX"));
        assert_eq!(
            place.map(|p| p.dominant_emotion),
            Some(Emotion::from("energetic"))
        );
        assert!(source.place(&PlaceId::new("nope")).await.ok().flatten().is_none());
    }
}
