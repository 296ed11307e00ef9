//! Core library for the `citypulse` backend service.
//!
//! The pipeline: an inbound reading is validated and appended to the
//! [`store::ReadingStore`], evaluated against thresholds by
//! [`evaluator::evaluate`], fanned into per-user inboxes
//! ([`inbox::AlertInbox`]) and pushed to per-city subscribers through the
//! [`fabric::DistributionFabric`]. Orchestration lives in [`pipeline`];
//! the HTTP/WebSocket surface in [`routes`].
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): `routes/mod.rs`
//! is the single gateway that knows about individual endpoint submodules.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod fabric;
pub mod inbox;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use state::AppState;
