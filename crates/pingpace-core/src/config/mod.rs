pub mod constants;
mod schedule;

pub use schedule::{ScheduleMode, ScheduleSettings};
