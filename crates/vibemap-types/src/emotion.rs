//! Emotion keys, emotion score maps, and the filter selection.
//!
//! Emotion keys are plain strings drawn from a small fixed vocabulary
//! ([`Emotion::VOCABULARY`]). The store may still hand back keys outside
//! the vocabulary; those are carried through untouched and rendered with
//! the fallback marker color.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single emotion key such as `happy` or `lonely`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct Emotion(pub String);

/// Mapping from emotion key to intensity in `[0.0, 1.0]`.
pub type EmotionScores = BTreeMap<Emotion, f64>;

impl Emotion {
    /// The emotion vocabulary scored by the place pipeline.
    pub const VOCABULARY: [&'static str; 8] = [
        "happy",
        "relaxed",
        "energetic",
        "nostalgic",
        "contemplative",
        "romantic",
        "anxious",
        "lonely",
    ];

    /// Create an emotion key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key belongs to [`Emotion::VOCABULARY`].
    pub fn is_known(&self) -> bool {
        Self::VOCABULARY.contains(&self.0.as_str())
    }

    /// Human-readable label: the key with its first letter capitalized.
    pub fn label(&self) -> String {
        let mut chars = self.0.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }

    /// The key with the highest intensity in `scores`.
    ///
    /// Ties resolve to the key that sorts first. Non-finite intensities
    /// are ignored. Returns `None` when no finite score exists.
    pub fn dominant_in(scores: &EmotionScores) -> Option<&Self> {
        let mut best: Option<(&Self, f64)> = None;
        for (emotion, &intensity) in scores {
            if !intensity.is_finite() {
                continue;
            }
            match best {
                Some((_, current)) if intensity <= current => {}
                _ => best = Some((emotion, intensity)),
            }
        }
        best.map(|(emotion, _)| emotion)
    }
}

impl core::fmt::Display for Emotion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Emotion {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

/// The emotion-category filter selected in the view.
///
/// Serialized as the string `"all"` or the selected emotion key. Fields
/// of this type are exported to `TypeScript` as `string`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterState {
    /// Show every place.
    #[default]
    All,
    /// Show only places whose dominant emotion is this key.
    Only(Emotion),
}

impl FilterState {
    /// Whether a place with the given dominant emotion passes the filter.
    pub fn matches(&self, dominant: &Emotion) -> bool {
        match self {
            Self::All => true,
            Self::Only(selected) => selected == dominant,
        }
    }

    /// Parse a filter from user input. `all` (any case) or an empty
    /// string selects every place; anything else is an emotion key.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(Emotion::new(trimmed))
        }
    }
}

impl From<String> for FilterState {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<FilterState> for String {
    fn from(filter: FilterState) -> Self {
        match filter {
            FilterState::All => Self::from("all"),
            FilterState::Only(emotion) => emotion.0,
        }
    }
}

impl core::fmt::Display for FilterState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(emotion) => f.write_str(emotion.as_str()),
        }
    }
}
