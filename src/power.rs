//! Sleep/wake detection by watching the wall clock outrun the monotonic one.
//!
//! The monotonic clock stops while the machine is suspended; the wall clock
//! does not. A tick whose wall-clock gap exceeds its monotonic gap by more
//! than the threshold means the host slept in between.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use pingpace_core::schedule::{Clock, PowerObserver, SystemClock};

/// Interval between clock comparisons
const DEFAULT_TICK: Duration = Duration::from_secs(5);
/// Wall-clock excess that counts as a sleep
const DEFAULT_THRESHOLD: Duration = Duration::from_secs(30);

pub struct SleepDetector {
    tick: Duration,
    threshold: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for SleepDetector {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SleepDetector {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tick: DEFAULT_TICK,
            threshold: DEFAULT_THRESHOLD,
            clock,
        }
    }

    /// Report every detected sleep to `observer` as suspend then resume
    pub fn spawn(self, observer: Arc<dyn PowerObserver>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            let mut last_mono = Instant::now();
            let mut last_wall = self.clock.now();
            loop {
                ticker.tick().await;
                let mono = Instant::now();
                let wall = self.clock.now();

                let wall_elapsed = (wall - last_wall).to_std().unwrap_or(Duration::ZERO);
                if let Some(slept) = sleep_gap(wall_elapsed, mono - last_mono, self.threshold) {
                    info!("Detected system sleep of about {}s", slept.as_secs());
                    observer.on_suspend();
                    observer.on_resume();
                }

                last_mono = mono;
                last_wall = wall;
            }
        })
    }
}

/// How long the host slept, if the wall clock ran ahead by more than `threshold`
pub fn sleep_gap(wall_elapsed: Duration, mono_elapsed: Duration, threshold: Duration) -> Option<Duration> {
    let excess = wall_elapsed.saturating_sub(mono_elapsed);
    (excess > threshold).then_some(excess)
}
