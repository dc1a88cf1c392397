//! FarmIntel HTTP server
//!
//! Exposes the prediction service over axum; configuration comes from an
//! optional file and `FARMINTEL_*` environment variables.

pub mod api;
pub mod config;
