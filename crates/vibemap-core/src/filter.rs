//! Emotion filter: the projection from a dataset onto the visible set.

use std::collections::BTreeMap;

use vibemap_types::{Emotion, FilterState, Place};

/// Return the places whose dominant emotion passes `filter`, in input order.
///
/// [`FilterState::All`] returns every place unchanged.
pub fn apply(places: &[Place], filter: &FilterState) -> Vec<Place> {
    match filter {
        FilterState::All => places.to_vec(),
        FilterState::Only(_) => places
            .iter()
            .filter(|place| filter.matches(&place.dominant_emotion))
            .cloned()
            .collect(),
    }
}

/// Count the places per dominant emotion, for filter-chip badges.
pub fn counts_by_emotion(places: &[Place]) -> BTreeMap<Emotion, usize> {
    let mut counts = BTreeMap::new();
    for place in places {
        let entry = counts.entry(place.dominant_emotion.clone()).or_insert(0_usize);
        *entry = entry.saturating_add(1);
    }
    counts
}

#[cfg(test)]
mod tests {
    use vibemap_types::{Coordinate, EmotionScores, PlaceId};

    use super::*;

    fn place(id: &str, dominant: &str) -> Place {
        let mut scores = EmotionScores::new();
        scores.insert(Emotion::from(dominant), 0.5);
        Place {
            id: PlaceId::new(id),
            name: id.to_uppercase(),
            coordinate: Coordinate::new(37.0, -122.0),
            emotion_scores: scores,
            dominant_emotion: Emotion::from(dominant),
            rating: 4.0,
            category_tags: Vec::new(),
            location_key: String::from("SF"),
        }
    }

    fn ids(places: &[Place]) -> Vec<&str> {
        places.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn all_is_identity() {
        let data = vec![place("a", "happy"), place("b", "lonely"), place("c", "happy")];
        assert_eq!(apply(&data, &FilterState::All), data);
    }

    #[test]
    fn single_emotion_keeps_order() {
        let data = vec![
            place("a", "happy"),
            place("b", "lonely"),
            place("c", "happy"),
            place("d", "relaxed"),
        ];
        let out = apply(&data, &FilterState::parse("happy"));
        assert_eq!(ids(&out), ["a", "c"]);
    }

    #[test]
    fn unmatched_emotion_is_empty() {
        let data = vec![place("a", "happy")];
        assert!(apply(&data, &FilterState::parse("anxious")).is_empty());
    }

    #[test]
    fn filtered_set_is_subsequence_for_every_emotion() {
        let data = vec![
            place("a", "happy"),
            place("b", "lonely"),
            place("c", "romantic"),
            place("d", "lonely"),
            place("e", "happy"),
        ];
        for key in Emotion::VOCABULARY {
            let filter = FilterState::parse(key);
            let out = apply(&data, &filter);
            let expected: Vec<&Place> = data
                .iter()
                .filter(|p| p.dominant_emotion.as_str() == key)
                .collect();
            assert_eq!(out.iter().collect::<Vec<_>>(), expected, "{key}");
        }
    }

    #[test]
    fn counts_group_by_dominant() {
        let data = vec![place("a", "happy"), place("b", "lonely"), place("c", "happy")];
        let counts = counts_by_emotion(&data);
        assert_eq!(counts.get(&Emotion::from("happy")), Some(&2));
        assert_eq!(counts.get(&Emotion::from("lonely")), Some(&1));
    }
}
