//! HTTP API: two-phase upload, URL ingest, status/transcript/stream reads,
//! and job dispatch wiring.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
