//! Scripted collaborators shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::history::HistorySink;
use crate::ping::{PingAttemptOutcome, PingExecutor, PingRequest, PingTrigger};
use crate::schedule::Clock;
use crate::usage::{UsageSnapshot, UsageSource};

/// Usage source replaying a script; repeats the last success when drained
pub struct ScriptedUsageSource {
    script: Mutex<VecDeque<Result<UsageSnapshot, String>>>,
    last_ok: Mutex<Option<UsageSnapshot>>,
    calls: AtomicUsize,
}

impl ScriptedUsageSource {
    pub fn new(script: Vec<Result<UsageSnapshot, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last_ok: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsageSource for ScriptedUsageSource {
    async fn fetch(&self) -> Result<UsageSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(snapshot)) => {
                *self.last_ok.lock() = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(Err(message)) => Err(anyhow!(message)),
            None => self
                .last_ok
                .lock()
                .clone()
                .ok_or_else(|| anyhow!("script exhausted")),
        }
    }
}

/// Ping executor replaying scripted outcomes; succeeds once drained
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Result<(), String>>>,
    delay: Duration,
    calls: Mutex<Vec<(Instant, PingRequest)>>,
}

impl ScriptedExecutor {
    /// `Ok(())` is a success, `Err(text)` a failure with that error text
    pub fn new(script: Vec<Result<(), String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds
    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }

    /// Simulated ping latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Instants at which attempts started
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(at, _)| *at).collect()
    }

    pub fn requests(&self) -> Vec<PingRequest> {
        self.calls.lock().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl PingExecutor for ScriptedExecutor {
    async fn execute(&self, request: &PingRequest) -> PingAttemptOutcome {
        self.calls.lock().push((Instant::now(), request.clone()));
        let next = self.script.lock().pop_front();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let duration = self.delay.as_secs_f64();
        match next {
            Some(Err(text)) => PingAttemptOutcome::failure(Utc::now(), duration, text),
            _ => PingAttemptOutcome::success(Utc::now(), duration),
        }
    }
}

/// History sink keeping everything in memory
#[derive(Default)]
pub struct RecordingHistory {
    attempts: Mutex<Vec<(PingTrigger, PingAttemptOutcome)>>,
    events: Mutex<Vec<String>>,
}

impl RecordingHistory {
    pub fn attempts(&self) -> Vec<(PingTrigger, PingAttemptOutcome)> {
        self.attempts.lock().clone()
    }

    pub fn triggers(&self) -> Vec<PingTrigger> {
        self.attempts.lock().iter().map(|(t, _)| *t).collect()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Attempts plus events
    pub fn total(&self) -> usize {
        self.attempts.lock().len() + self.events.lock().len()
    }
}

impl HistorySink for RecordingHistory {
    fn record(&self, trigger: PingTrigger, outcome: &PingAttemptOutcome) {
        self.attempts.lock().push((trigger, outcome.clone()));
    }

    fn record_event(&self, message: &str) {
        self.events.lock().push(message.to_string());
    }
}

/// Wall clock that advances with tokio's (pausable) clock.
///
/// Local time is UTC so window tests do not depend on the host zone.
pub struct PausedClock {
    base_wall: DateTime<Utc>,
    base_instant: Instant,
}

impl PausedClock {
    pub fn new(base_wall: DateTime<Utc>) -> Self {
        Self {
            base_wall,
            base_instant: Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.base_instant);
        self.base_wall + chrono::Duration::from_std(elapsed).unwrap_or_default()
    }

    fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.naive_utc()
    }
}
