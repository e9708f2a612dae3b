//! Shared type definitions for the Vibemap emotional heatmap.
//!
//! This crate is the single source of truth for the types that cross
//! crate boundaries: the normalized [`Place`] produced by the data
//! layer, the emotion vocabulary and filter selection, the marker and
//! popup descriptors computed by the synchronizer, and the JSON wire
//! protocol spoken with the browser map client. Types flow downstream
//! to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Identifier wrappers (places, views, map handles)
//! - [`emotion`] -- Emotion keys, score maps, and [`FilterState`]
//! - [`place`] -- [`Place`], [`Coordinate`], and [`Bounds`]
//! - [`map`] -- Map options, styling rules, marker and popup descriptors
//! - [`wire`] -- Commands and frames exchanged with a live map view
//! - [`api`] -- REST response bodies

pub mod api;
pub mod emotion;
pub mod ids;
pub mod map;
pub mod place;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use api::{HeatmapResponse, PlaceEmotionsResponse};
pub use emotion::{Emotion, EmotionScores, FilterState};
pub use ids::{MapHandle, MarkerHandle, PlaceId, PopupHandle, ViewId};
pub use map::{MapOptions, MapStyleRule, MarkerSpec, PopupContent};
pub use place::{Bounds, Coordinate, Place};
pub use wire::{ClientFrame, MapCommand, ServerFrame, ViewStatus};
