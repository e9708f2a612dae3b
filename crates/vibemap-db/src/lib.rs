//! `PostgreSQL` place store for the Vibemap emotional heatmap.
//!
//! Place documents live in a single `places` table keyed by id, with
//! the `city` field copied into an indexed column. [`PgPlaceStore`]
//! implements the core [`PlaceStore`] trait so the view engine and the
//! HTTP API can read from `PostgreSQL` the same way they read from the
//! in-memory store.
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`place_store`] -- Place document queries and upserts
//! - [`error`] -- Shared error types
//!
//! [`PlaceStore`]: vibemap_core::store::PlaceStore

pub mod error;
pub mod place_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use error::DbError;
pub use place_store::{PgPlaceStore, PlaceRow};
pub use postgres::{PostgresConfig, PostgresPool};
