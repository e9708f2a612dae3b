//! Places and geographic coordinates.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::emotion::{Emotion, EmotionScores};
use crate::ids::PlaceId;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// Latitude in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in `[-180, 180]`.
    pub lng: f64,
}

impl Coordinate {
    /// Create a coordinate without validation.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside standard bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// An axis-aligned latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bounds {
    /// Southern edge (minimum latitude).
    pub south: f64,
    /// Western edge (minimum longitude).
    pub west: f64,
    /// Northern edge (maximum latitude).
    pub north: f64,
    /// Eastern edge (maximum longitude).
    pub east: f64,
}

impl Bounds {
    /// Smallest rectangle containing every coordinate.
    ///
    /// Returns `None` for an empty slice. A single point yields a
    /// zero-area rectangle.
    pub fn enclosing(points: &[Coordinate]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let seed = Self {
            south: first.lat,
            west: first.lng,
            north: first.lat,
            east: first.lng,
        };
        Some(rest.iter().fold(seed, |b, p| Self {
            south: b.south.min(p.lat),
            west: b.west.min(p.lng),
            north: b.north.max(p.lat),
            east: b.east.max(p.lng),
        }))
    }

    /// Whether the point lies inside or on the edge of the rectangle.
    pub fn contains(&self, point: &Coordinate) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lng)
    }
}

/// A normalized place with its emotion profile.
///
/// Produced by the data source from a raw store document. Immutable
/// once fetched; every field has already been defaulted, so
/// `dominant_emotion` is always either a key of `emotion_scores` or
/// the configured default emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Place {
    /// Store identifier, unique within one dataset.
    pub id: PlaceId,
    /// Display name.
    pub name: String,
    /// Map position.
    pub coordinate: Coordinate,
    /// Emotion intensities in `[0.0, 1.0]`.
    pub emotion_scores: EmotionScores,
    /// Emotion with the highest score (or the configured default).
    pub dominant_emotion: Emotion,
    /// Rating in `[0, 5]`.
    pub rating: f64,
    /// Place-type tags (e.g. `cafe`, `bar`).
    pub category_tags: Vec<String>,
    /// The location key this place was fetched under.
    pub location_key: String,
}

impl Place {
    /// Intensity of the dominant emotion, `0.0` when it has no score.
    pub fn dominant_intensity(&self) -> f64 {
        self.emotion_scores
            .get(&self.dominant_emotion)
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_bounds_check() {
        assert!(Coordinate::new(37.77, -122.42).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn enclosing_bounds_of_points() {
        let pts = [
            Coordinate::new(37.7, -122.5),
            Coordinate::new(37.8, -122.4),
            Coordinate::new(37.75, -122.45),
        ];
        let b = Bounds::enclosing(&pts);
        assert_eq!(
            b,
            Some(Bounds {
                south: 37.7,
                west: -122.5,
                north: 37.8,
                east: -122.4,
            })
        );
        assert!(pts.iter().all(|p| b.is_some_and(|b| b.contains(p))));
    }

    #[test]
    fn enclosing_empty_is_none() {
        assert_eq!(Bounds::enclosing(&[]), None);
    }

    #[test]
    fn dominant_intensity_defaults_to_zero() {
        let place = Place {
            id: PlaceId::new("p"),
            name: String::from("Nowhere"),
            coordinate: Coordinate::new(0.0, 0.0),
            emotion_scores: EmotionScores::new(),
            dominant_emotion: Emotion::from("happy"),
            rating: 0.0,
            category_tags: Vec::new(),
            location_key: String::from("X"),
        };
        assert!(place.dominant_intensity().abs() < f64::EPSILON);
    }
}
