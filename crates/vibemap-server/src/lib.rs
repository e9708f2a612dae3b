//! Heatmap API and live map view server for Vibemap.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for the emotional heatmap of a location, the
//!   emotion profile of a single place, and the map bootstrap settings
//!   a browser client needs before it can load the mapping script
//! - **`WebSocket` endpoint** (`/ws/view`) hosting one live map view per
//!   connection: the server runs the view engine and streams map
//!   commands and status changes; the client streams location and
//!   filter changes back
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! All requests read through a shared [`DataSource`] over whichever
//! place store was configured at startup (`PostgreSQL` or in-memory).
//! Every `WebSocket` view owns its own engine and marker set; the only
//! state shared between views is the process-wide mapping script load.
//!
//! [`DataSource`]: vibemap_core::source::DataSource

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, PlaceBackend};
