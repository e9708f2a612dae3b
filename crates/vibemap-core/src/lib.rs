//! View synchronization engine for the Vibemap emotional heatmap.
//!
//! Three asynchronous inputs feed a mounted map view: the one-time load
//! of the external mapping script, a per-location dataset fetch, and the
//! user's emotion filter. This crate reconciles them into one consistent
//! set of on-screen markers without duplicate script loads, leaked
//! markers, or a late response for an old location overwriting a newer
//! one.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `vibemap-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- Error taxonomy folded into the view status.
//! - [`filter`] -- Emotion filter projection.
//! - [`loader`] -- Load-once [`ResourceLoader`] and the mapping script source.
//! - [`store`] -- [`PlaceStore`] trait and the in-memory store.
//! - [`source`] -- Normalization and stale-aware [`DataSource`] fetches.
//! - [`surface`] -- [`MapBackend`] capability trait and [`MapSurface`] lifecycle.
//! - [`backend`] -- [`CommandBackend`], a backend emitting map commands.
//! - [`sync`] -- [`MarkerSynchronizer`] reconciliation.
//! - [`view`] -- [`ViewEngine`] per-view state machine.
//! - [`session`] -- [`ViewSession`] async driver.
//!
//! [`ResourceLoader`]: loader::ResourceLoader
//! [`PlaceStore`]: store::PlaceStore
//! [`DataSource`]: source::DataSource
//! [`MapBackend`]: surface::MapBackend
//! [`MapSurface`]: surface::MapSurface
//! [`CommandBackend`]: backend::CommandBackend
//! [`MarkerSynchronizer`]: sync::MarkerSynchronizer
//! [`ViewEngine`]: view::ViewEngine
//! [`ViewSession`]: session::ViewSession

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod session;
pub mod source;
pub mod store;
pub mod surface;
pub mod sync;
pub mod view;
