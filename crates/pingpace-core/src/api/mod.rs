//! Public API layer (Facade) for pingpace-core.
//!
//! [`PingPaceCore`] wires the scheduler, the usage monitor and the velocity
//! tracker together and exposes them to hosts.
//!
//! # Quick Start
//!
//! ```ignore
//! use pingpace_core::api::PingPaceCoreBuilder;
//!
//! let core = PingPaceCoreBuilder::new(settings)
//!     .with_executor(executor)
//!     .with_usage_source(source)
//!     .build()?;
//!
//! core.start_polling();
//! let mut rx = core.subscribe();
//! ```

mod builder;
mod core;
pub mod events;

pub use builder::PingPaceCoreBuilder;
pub use core::PingPaceCore;
pub use events::CoreEvent;
