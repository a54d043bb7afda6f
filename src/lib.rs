//! Rack controller firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod schema;
pub mod topics;

pub mod pins;

// The adapters and drivers compile on every target; the ESP-IDF
// implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
