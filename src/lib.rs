//! pingpace: keep-warm ping scheduler with usage velocity tracking.
//!
//! The engine lives in `pingpace-core`; this crate supplies the process-backed
//! ping executor and usage source, sleep detection, configuration and the CLI.

pub mod app;
pub mod config;
pub mod executor;
pub mod power;
pub mod usage_source;
