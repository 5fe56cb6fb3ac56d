//! The scheduler actor.
//!
//! One task owns every piece of scheduling state and reacts to commands,
//! completed pings, usage snapshots and its own deadlines from a single
//! `select!` loop. Ping attempts and usage refreshes run in spawned tasks and
//! report back over the completion channel, so state only ever changes on
//! the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::deadline::DeadlineQueue;
use super::reset::{ResetPingState, ResetVerdict};
use super::retry::{RetryContext, RetryDecision, RetryState};
use super::state::{RetryProgress, ScheduleState, SchedulerPhase, SchedulerStatus};
use super::window::{next_fire_at, should_fire};
use crate::api::CoreEvent;
use crate::config::constants::{
    RESET_COALESCE_WINDOW, RESET_MAX_RETRIES, RESET_SETTLE_DELAY, SETTINGS_DEBOUNCE,
    WAKE_SETTLE_DELAY,
};
use crate::config::ScheduleSettings;
use crate::error::CoreError;
use crate::history::HistorySink;
use crate::ping::{PingAttemptOutcome, PingExecutor, PingRequest, PingStatus, PingTrigger};
use crate::usage::{UsageMonitor, UsageSnapshot, UsageSnapshotReceiver};

/// Kinds of pending deadline; at most one of each is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeadlineKind {
    NextPing,
    ResetPing,
    ResetRecheck,
    Retry,
    SettingsDebounce,
}

/// Commands accepted by the scheduler loop
#[derive(Debug)]
pub enum SchedulerCommand {
    Start,
    Stop,
    /// Recompute the regular deadline from the current anchor
    Reschedule,
    UpdateSettings(Box<ScheduleSettings>),
    Suspend,
    Resume,
    Shutdown,
}

/// Work finished off the loop
enum Completion {
    Ping {
        trigger: PingTrigger,
        outcome: PingAttemptOutcome,
        /// Reset target a reset ping was dispatched for
        reset_target: Option<DateTime<Utc>>,
    },
    ResetRecheck {
        target: Option<DateTime<Utc>>,
        snapshot: Option<UsageSnapshot>,
    },
}

/// Reference point the regular deadline is computed from
#[derive(Debug, Clone, Copy)]
struct Anchor {
    instant: Instant,
    wall: DateTime<Utc>,
}

/// Hooks the host calls around system sleep
pub trait PowerObserver: Send + Sync {
    fn on_suspend(&self);
    fn on_resume(&self);
}

/// Collaborators injected into the scheduler
pub struct SchedulerDeps {
    pub executor: Arc<dyn PingExecutor>,
    pub history: Arc<dyn HistorySink>,
    /// Usage feed for reset detection (reset pings are disabled without it)
    pub usage: Option<Arc<UsageMonitor>>,
    pub clock: Arc<dyn Clock>,
    pub events: Option<broadcast::Sender<CoreEvent>>,
}

impl SchedulerDeps {
    pub fn new(executor: Arc<dyn PingExecutor>, history: Arc<dyn HistorySink>) -> Self {
        Self {
            executor,
            history,
            usage: None,
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    pub fn with_usage(mut self, usage: Arc<UsageMonitor>) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: broadcast::Sender<CoreEvent>) -> Self {
        self.events = Some(events);
        self
    }
}

/// Cloneable handle to a running scheduler
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<SchedulerCommand>,
    status: watch::Receiver<SchedulerStatus>,
}

impl SchedulerHandle {
    /// Stopped → Scheduled
    pub fn start(&self) -> Result<(), CoreError> {
        self.send(SchedulerCommand::Start)
    }

    /// Any → Stopped; an in-flight ping still gets recorded
    pub fn stop(&self) -> Result<(), CoreError> {
        self.send(SchedulerCommand::Stop)
    }

    /// Recompute the regular deadline (idempotent for unchanged settings)
    pub fn reschedule(&self) -> Result<(), CoreError> {
        self.send(SchedulerCommand::Reschedule)
    }

    /// Push new settings; timing edits are debounced
    pub fn update_settings(&self, settings: ScheduleSettings) -> Result<(), CoreError> {
        self.send(SchedulerCommand::UpdateSettings(Box::new(settings)))
    }

    pub fn suspend(&self) -> Result<(), CoreError> {
        self.send(SchedulerCommand::Suspend)
    }

    pub fn resume(&self) -> Result<(), CoreError> {
        self.send(SchedulerCommand::Resume)
    }

    /// Ask the loop to exit
    pub fn shutdown(&self) -> Result<(), CoreError> {
        self.send(SchedulerCommand::Shutdown)
    }

    /// Latest published status
    pub fn status(&self) -> SchedulerStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }

    fn send(&self, command: SchedulerCommand) -> Result<(), CoreError> {
        self.commands
            .send(command)
            .map_err(|_| CoreError::SchedulerClosed)
    }
}

impl PowerObserver for SchedulerHandle {
    fn on_suspend(&self) {
        if self.suspend().is_err() {
            debug!("Suspend ignored: scheduler already shut down");
        }
    }

    fn on_resume(&self) {
        if self.resume().is_err() {
            debug!("Resume ignored: scheduler already shut down");
        }
    }
}

/// Scheduler state owned by the loop task
pub struct Scheduler {
    settings: ScheduleSettings,
    /// Timing edits waiting for the debounce deadline
    pending_settings: Option<ScheduleSettings>,
    deps: SchedulerDeps,
    deadlines: DeadlineQueue<DeadlineKind>,
    running: bool,
    suspended: bool,
    phase: SchedulerPhase,
    anchor: Option<Anchor>,
    next_fire_at: Option<DateTime<Utc>>,
    reset: ResetPingState,
    retry: Option<RetryState>,
    completions: mpsc::UnboundedSender<Completion>,
    status_tx: watch::Sender<SchedulerStatus>,
}

impl Scheduler {
    /// Spawn the scheduler loop.
    ///
    /// Starts the regular schedule if `settings.enabled`, and arms the startup
    /// ping protocol if `settings.ping_on_startup`.
    pub fn spawn(settings: ScheduleSettings, deps: SchedulerDeps) -> (SchedulerHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SchedulerStatus::default());
        let usage_rx = deps.usage.as_ref().map(|monitor| monitor.subscribe());

        let scheduler = Scheduler {
            settings,
            pending_settings: None,
            deps,
            deadlines: DeadlineQueue::new(),
            running: false,
            suspended: false,
            phase: SchedulerPhase::Stopped,
            anchor: None,
            next_fire_at: None,
            reset: ResetPingState::default(),
            retry: None,
            completions: completion_tx,
            status_tx,
        };

        let task = tokio::spawn(scheduler.run(command_rx, completion_rx, usage_rx));
        let handle = SchedulerHandle {
            commands: command_tx,
            status: status_rx,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SchedulerCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        mut usage_rx: Option<UsageSnapshotReceiver>,
    ) {
        self.bootstrap();
        self.publish_status();

        loop {
            let next_deadline = self.deadlines.next_deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(SchedulerCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(done) = completions.recv() => self.handle_completion(done),
                Some(snapshot) = next_usage(&mut usage_rx) => self.on_usage(&snapshot),
                _ = sleep_until_deadline(next_deadline) => self.fire_due(),
            }

            self.publish_status();
        }

        info!("Scheduler shut down");
    }

    fn bootstrap(&mut self) {
        if self.settings.enabled {
            self.start();
        }
        if self.settings.ping_on_startup {
            self.begin_retry(RetryContext::Startup);
        }
        if let Some(snapshot) = self.deps.usage.as_ref().and_then(|m| m.latest()) {
            self.on_usage(&snapshot);
        }
    }

    fn handle_command(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::Start => self.start(),
            SchedulerCommand::Stop => self.stop(),
            SchedulerCommand::Reschedule => self.reschedule(),
            SchedulerCommand::UpdateSettings(settings) => self.update_settings(*settings),
            SchedulerCommand::Suspend => self.suspend(),
            SchedulerCommand::Resume => self.resume(),
            SchedulerCommand::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Ping {
                trigger,
                outcome,
                reset_target,
            } => self.on_ping_finished(trigger, outcome, reset_target),
            Completion::ResetRecheck { target, snapshot } => self.on_reset_recheck(target, snapshot),
        }
    }

    fn fire_due(&mut self) {
        for (kind, at) in self.deadlines.pop_due(Instant::now()) {
            match kind {
                DeadlineKind::NextPing => self.fire_regular(at),
                DeadlineKind::ResetPing => self.fire_reset(),
                DeadlineKind::ResetRecheck => self.recheck_reset(),
                DeadlineKind::Retry => self.fire_retry(),
                DeadlineKind::SettingsDebounce => self.apply_pending_settings(),
            }
        }
    }

    // =========================================================
    // Regular schedule
    // =========================================================

    fn start(&mut self) {
        self.settings.enabled = true;
        if self.running {
            debug!("Start ignored: scheduler already running");
            return;
        }

        self.running = true;
        self.cancel_retry();
        self.anchor = Some(self.now_anchor());
        self.reschedule();
        info!(
            "Scheduler started, every {} min ({:?})",
            self.settings.interval_minutes, self.settings.mode
        );
        self.deps.history.record_event("Scheduler started");
    }

    fn stop(&mut self) {
        self.settings.enabled = false;
        if !self.running {
            return;
        }

        self.running = false;
        self.deadlines.cancel(DeadlineKind::NextPing);
        self.anchor = None;
        self.next_fire_at = None;
        self.phase = SchedulerPhase::Stopped;
        info!("Scheduler stopped");
        self.deps.history.record_event("Scheduler stopped");
        self.emit(CoreEvent::ScheduleChanged { next_fire_at: None });
    }

    /// Arm the regular deadline from the anchor.
    ///
    /// The anchor only moves on start, fire, applied settings and wake, so
    /// calling this repeatedly yields the same deadline.
    fn reschedule(&mut self) {
        if !self.running {
            return;
        }

        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => {
                let anchor = self.now_anchor();
                self.anchor = Some(anchor);
                anchor
            }
        };

        let local_anchor = self.deps.clock.local(anchor.wall);
        let offset = next_fire_at(local_anchor, &self.settings) - local_anchor;
        let delay = offset.to_std().unwrap_or(Duration::ZERO);
        let wall = anchor.wall + offset;

        self.deadlines
            .arm(DeadlineKind::NextPing, anchor.instant + delay);
        self.phase = SchedulerPhase::Scheduled;

        if self.next_fire_at != Some(wall) {
            self.next_fire_at = Some(wall);
            info!("Next ping at {}", wall);
            self.emit(CoreEvent::ScheduleChanged {
                next_fire_at: Some(wall),
            });
        }
    }

    fn fire_regular(&mut self, deadline: Instant) {
        if !self.running {
            return;
        }

        let wall = self.next_fire_at.unwrap_or_else(|| self.deps.clock.now());
        self.anchor = Some(Anchor {
            instant: deadline,
            wall,
        });

        let local = self.deps.clock.local(wall);
        if !should_fire(local, &self.settings) {
            info!("{} is outside the ping window, waiting for it to open", local.time());
            self.reschedule();
            return;
        }

        self.phase = SchedulerPhase::Firing;
        self.dispatch_ping(PingTrigger::Scheduled);
    }

    fn update_settings(&mut self, new: ScheduleSettings) {
        self.settings.ping_on_wake = new.ping_on_wake;
        self.settings.ping_on_startup = new.ping_on_startup;
        self.settings.prompt = new.prompt.clone();
        self.settings.model = new.model.clone();

        if self.settings.timing_differs(&new) || self.pending_settings.is_some() {
            debug!("Schedule timing changed, debouncing");
            self.pending_settings = Some(new.clone());
            self.deadlines
                .arm(DeadlineKind::SettingsDebounce, Instant::now() + SETTINGS_DEBOUNCE);
        }

        if new.enabled != self.settings.enabled {
            if new.enabled {
                self.start();
            } else {
                self.stop();
            }
        }
    }

    fn apply_pending_settings(&mut self) {
        let Some(pending) = self.pending_settings.take() else {
            return;
        };
        if !self.settings.timing_differs(&pending) {
            debug!("Debounced settings match current timing, nothing to do");
            return;
        }

        self.settings.apply_timing(&pending);
        info!(
            "Schedule settings applied: every {} min ({:?}, window {}-{})",
            self.settings.interval_minutes,
            self.settings.mode,
            self.settings.window_start.format("%H:%M"),
            self.settings.window_end.format("%H:%M")
        );

        if self.running && !self.suspended {
            self.anchor = Some(self.now_anchor());
            self.reschedule();
        }
    }

    // =========================================================
    // Sleep / wake and the network-retry protocol
    // =========================================================

    fn suspend(&mut self) {
        if self.suspended {
            return;
        }
        self.suspended = true;
        self.deadlines.cancel(DeadlineKind::NextPing);
        self.cancel_retry();
        info!("System suspending, pending ping deadline cancelled");
    }

    fn resume(&mut self) {
        self.suspended = false;

        // Deadlines measured monotonic time across the sleep; rebase the
        // reset ping on its wall-clock target.
        if self.deadlines.is_armed(DeadlineKind::ResetPing) {
            if let Some(target) = self.reset.scheduled_reset_at {
                self.arm_reset_at(target);
            }
        }

        if self.settings.ping_on_wake {
            info!("System woke, wake ping in {}s", WAKE_SETTLE_DELAY.as_secs());
            self.begin_retry(RetryContext::Wake);
        } else if self.running {
            info!("System woke, rescheduling");
            self.anchor = Some(self.now_anchor());
            self.reschedule();
        }
    }

    fn begin_retry(&mut self, context: RetryContext) {
        self.retry = Some(RetryState::new(context));
        self.deadlines
            .arm(DeadlineKind::Retry, Instant::now() + WAKE_SETTLE_DELAY);
    }

    fn cancel_retry(&mut self) {
        self.deadlines.cancel(DeadlineKind::Retry);
        self.retry = None;
    }

    fn fire_retry(&mut self) {
        let Some(state) = &self.retry else {
            return;
        };
        let trigger = state.context.trigger();
        self.dispatch_ping(trigger);
    }

    fn advance_retry(&mut self, trigger: PingTrigger, outcome: &PingAttemptOutcome) {
        let Some(state) = self.retry.as_mut() else {
            debug!("{} ping finished after its retry run was cancelled", trigger);
            return;
        };
        if state.context.trigger() != trigger {
            return;
        }

        let label = state.context.label();
        match state.after_attempt(outcome) {
            RetryDecision::Succeeded => {
                info!("{} ping succeeded", label);
                self.finish_retry();
            }
            RetryDecision::RetryAfter(delay) => {
                let attempt = state.attempt;
                self.deadlines
                    .arm(DeadlineKind::Retry, Instant::now() + delay);
                info!("{} ping hit a network error, retrying in {}s", label, delay.as_secs());
                self.deps.history.record_event(&format!(
                    "{} ping attempt {} failed with a network error, retrying in {}s",
                    label,
                    attempt,
                    delay.as_secs()
                ));
            }
            RetryDecision::Aborted => {
                warn!("{} ping failed with a non-network error, not retrying", label);
                self.deps.history.record_event(&format!(
                    "{} ping failed with a non-network error, not retrying",
                    label
                ));
                self.finish_retry();
            }
            RetryDecision::Exhausted => {
                let attempts = state.attempt;
                warn!("{} ping gave up after {} attempts", label, attempts);
                self.deps.history.record_event(&format!(
                    "{} ping gave up after {} attempts",
                    label, attempts
                ));
                self.finish_retry();
            }
        }
    }

    fn finish_retry(&mut self) {
        let context = self.retry.take().map(|state| state.context);
        self.deadlines.cancel(DeadlineKind::Retry);

        if context == Some(RetryContext::Wake) && self.running && !self.suspended {
            self.anchor = Some(self.now_anchor());
            self.reschedule();
        }
    }

    // =========================================================
    // Reset-triggered pings
    // =========================================================

    fn on_usage(&mut self, snapshot: &UsageSnapshot) {
        let Some(target) = self.reset.consider(snapshot) else {
            return;
        };

        info!(
            "Session reset predicted at {} ({:.1}% used), reset ping armed",
            target, snapshot.session_utilization
        );
        self.deadlines.cancel(DeadlineKind::ResetRecheck);
        self.arm_reset_at(target);
        self.emit(CoreEvent::ResetArmed { target });
    }

    fn arm_reset_at(&mut self, target: DateTime<Utc>) {
        let delay = (target - self.deps.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.deadlines
            .arm(DeadlineKind::ResetPing, Instant::now() + delay);
    }

    fn fire_reset(&mut self) {
        let now = Instant::now();
        let regular_imminent = self.phase == SchedulerPhase::Firing
            || self
                .deadlines
                .get(DeadlineKind::NextPing)
                .is_some_and(|at| at.saturating_duration_since(now) <= RESET_COALESCE_WINDOW);

        if regular_imminent {
            info!("Regular ping is imminent, skipping reset ping");
            self.emit(CoreEvent::ResetSkipped {
                target: self.reset.scheduled_reset_at,
            });
            return;
        }

        self.dispatch_ping(PingTrigger::Reset);
    }

    fn recheck_reset(&mut self) {
        let completions = self.completions.clone();
        let target = self.reset.scheduled_reset_at;
        let Some(monitor) = self.deps.usage.clone() else {
            let _ = completions.send(Completion::ResetRecheck {
                target,
                snapshot: None,
            });
            return;
        };

        tokio::spawn(async move {
            let snapshot = match monitor.refresh().await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("Usage refresh for reset check failed: {:#}", e);
                    monitor.latest()
                }
            };
            let _ = completions.send(Completion::ResetRecheck { target, snapshot });
        });
    }

    fn on_reset_recheck(&mut self, target: Option<DateTime<Utc>>, snapshot: Option<UsageSnapshot>) {
        // A newer target was armed while the check ran; its own ping decides
        if target != self.reset.scheduled_reset_at {
            debug!("Reset target moved during the check, dropping the verdict");
            return;
        }

        let before = self.reset.pre_reset_utilization;
        let current = match snapshot {
            Some(snapshot) => snapshot.session_utilization,
            None => {
                warn!("No usage available to confirm the reset");
                before
            }
        };

        match self.reset.verdict(current) {
            ResetVerdict::Confirmed => {
                info!("Usage reset confirmed ({:.0}% -> {:.0}%)", before, current);
                self.deps.history.record_event(&format!(
                    "Usage reset confirmed ({:.0}% -> {:.0}%)",
                    before, current
                ));
            }
            ResetVerdict::RetryAfter(delay) => {
                let retry = self.reset.retry_count;
                info!(
                    "Usage still at {:.0}%, reset ping retry {} in {}s",
                    current,
                    retry,
                    delay.as_secs()
                );
                self.deps.history.record_event(&format!(
                    "Usage reset not confirmed ({:.0}%), retry {} of {} in {}s",
                    current,
                    retry,
                    RESET_MAX_RETRIES,
                    delay.as_secs()
                ));
                self.deadlines
                    .arm(DeadlineKind::ResetPing, Instant::now() + delay);
            }
            ResetVerdict::Exhausted => {
                warn!("Reset ping gave up after {} retries", RESET_MAX_RETRIES);
                self.deps.history.record_event(&format!(
                    "Reset ping gave up after {} retries, usage still at {:.0}%",
                    RESET_MAX_RETRIES, current
                ));
            }
        }
    }

    // =========================================================
    // Ping dispatch and completion
    // =========================================================

    fn dispatch_ping(&self, trigger: PingTrigger) {
        let executor = Arc::clone(&self.deps.executor);
        let completions = self.completions.clone();
        let refresh_first = match trigger {
            PingTrigger::Reset => self.deps.usage.clone(),
            _ => None,
        };
        let reset_target = match trigger {
            PingTrigger::Reset => self.reset.scheduled_reset_at,
            _ => None,
        };
        let request = PingRequest {
            prompt: self.settings.prompt.clone(),
            model: self.settings.model.clone(),
        };

        info!("Dispatching {} ping ({})", trigger, request.model);
        tokio::spawn(async move {
            if let Some(monitor) = refresh_first {
                if let Err(e) = monitor.refresh().await {
                    warn!("Usage refresh before reset ping failed: {:#}", e);
                }
            }
            let outcome = executor.execute(&request).await;
            let _ = completions.send(Completion::Ping {
                trigger,
                outcome,
                reset_target,
            });
        });
    }

    fn on_ping_finished(
        &mut self,
        trigger: PingTrigger,
        outcome: PingAttemptOutcome,
        reset_target: Option<DateTime<Utc>>,
    ) {
        match outcome.status {
            PingStatus::Success => info!(
                "{} ping succeeded in {:.1}s",
                trigger, outcome.duration_secs
            ),
            PingStatus::Error => warn!(
                "{} ping failed: {}",
                trigger,
                outcome.error_text.as_deref().unwrap_or("unknown error")
            ),
        }

        self.deps.history.record(trigger, &outcome);
        self.emit(CoreEvent::PingCompleted {
            trigger,
            status: outcome.status,
            error: outcome.error_text.clone(),
        });

        if let (Some(usage), Some(monitor)) = (outcome.usage_from_ping.clone(), &self.deps.usage) {
            monitor.publish(usage);
        }

        match trigger {
            PingTrigger::Scheduled => {
                if self.running {
                    self.phase = SchedulerPhase::Scheduled;
                    if !self.suspended {
                        self.reschedule();
                    }
                }
            }
            PingTrigger::Wake | PingTrigger::Startup => self.advance_retry(trigger, &outcome),
            PingTrigger::Reset => {
                if reset_target == self.reset.scheduled_reset_at {
                    self.deadlines
                        .arm(DeadlineKind::ResetRecheck, Instant::now() + RESET_SETTLE_DELAY);
                } else {
                    debug!("Reset ping finished for a superseded target, not checking it");
                }
            }
        }
    }

    // =========================================================
    // Helpers
    // =========================================================

    fn now_anchor(&self) -> Anchor {
        Anchor {
            instant: Instant::now(),
            wall: self.deps.clock.now(),
        }
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(events) = &self.deps.events {
            let _ = events.send(event);
        }
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            schedule: ScheduleState {
                enabled: self.settings.enabled,
                mode: self.settings.mode,
                interval_minutes: self.settings.interval_minutes,
                window_start: self.settings.window_start,
                window_end: self.settings.window_end,
                next_fire_at: self.next_fire_at,
                running: self.running,
                phase: self.phase,
            },
            suspended: self.suspended,
            reset_target: self.reset.scheduled_reset_at,
            reset_armed: self.deadlines.is_armed(DeadlineKind::ResetPing),
            reset_retry_count: self.reset.retry_count,
            retry: self.retry.as_ref().map(|state| RetryProgress {
                context: state.context,
                attempt: state.attempt,
                max_attempts: state.max_attempts,
            }),
        }
    }

    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

/// Wait for the next usage snapshot; never resolves without a feed
async fn next_usage(rx: &mut Option<UsageSnapshotReceiver>) -> Option<UsageSnapshot> {
    let Some(receiver) = rx.as_mut() else {
        return std::future::pending().await;
    };
    if receiver.changed().await.is_err() {
        *rx = None;
        return None;
    }
    let snapshot = receiver.borrow_and_update().clone();
    snapshot
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests;
