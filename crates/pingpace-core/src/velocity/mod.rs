//! Usage velocity tracking.
//!
//! [`VelocityTracker`] keeps a de-duplicated, downsampled history of usage
//! samples and derives consumption velocity over three windows (current
//! session, trailing week, all time), the time until the session meter is
//! exhausted, per-model projections and a cheaper-model advisory.

pub mod compute;
pub mod models;
pub mod report;
pub mod sample;
pub mod store;
mod tracker;

pub use models::{detect_active_model, ModelFamily};
pub use report::{ModelAdvisory, ModelProjection, VelocityReport};
pub use sample::{ModelUtilization, Sample};
pub use store::{JsonSampleStore, MemorySampleStore, SampleStore, StoreError};
pub use tracker::VelocityTracker;
