use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::*;
use crate::config::ScheduleMode;
use crate::test_support::{PausedClock, RecordingHistory, ScriptedExecutor, ScriptedUsageSource};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn minutes(m: i64) -> chrono::Duration {
    chrono::Duration::minutes(m)
}

fn all_day(interval_minutes: u32) -> ScheduleSettings {
    ScheduleSettings {
        enabled: true,
        interval_minutes,
        ..Default::default()
    }
}

struct Harness {
    handle: SchedulerHandle,
    task: JoinHandle<()>,
    executor: Arc<ScriptedExecutor>,
    history: Arc<RecordingHistory>,
    started: Instant,
}

impl Harness {
    fn spawn(settings: ScheduleSettings, executor: ScriptedExecutor) -> Self {
        Self::spawn_with(settings, executor, None, None)
    }

    fn spawn_with(
        settings: ScheduleSettings,
        executor: ScriptedExecutor,
        usage: Option<Arc<UsageMonitor>>,
        events: Option<broadcast::Sender<CoreEvent>>,
    ) -> Self {
        let executor = Arc::new(executor);
        let history = Arc::new(RecordingHistory::default());
        let mut deps = SchedulerDeps::new(executor.clone(), history.clone())
            .with_clock(Arc::new(PausedClock::new(base())));
        if let Some(monitor) = usage {
            deps = deps.with_usage(monitor);
        }
        if let Some(tx) = events {
            deps = deps.with_events(tx);
        }
        let started = Instant::now();
        let (handle, task) = Scheduler::spawn(settings, deps);
        Self {
            handle,
            task,
            executor,
            history,
            started,
        }
    }

    fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.handle.status().schedule.next_fire_at
    }

    /// Attempt start times relative to spawn
    fn call_offsets(&self) -> Vec<Duration> {
        self.executor
            .call_times()
            .into_iter()
            .map(|at| at - self.started)
            .collect()
    }
}

async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}

async fn settle() {
    advance(Duration::from_millis(1)).await;
}

fn usage_monitor(script: Vec<Result<UsageSnapshot, String>>) -> (Arc<UsageMonitor>, Arc<ScriptedUsageSource>) {
    let source = Arc::new(ScriptedUsageSource::new(script));
    (Arc::new(UsageMonitor::new(source.clone())), source)
}

#[tokio::test(start_paused = true)]
async fn test_all_day_fires_every_interval() {
    let h = Harness::spawn(all_day(60), ScriptedExecutor::succeeding());
    settle().await;

    let status = h.handle.status();
    assert!(status.schedule.running);
    assert_eq!(status.schedule.phase, SchedulerPhase::Scheduled);
    assert_eq!(h.next_fire_at(), Some(base() + minutes(60)));

    advance(Duration::from_secs(60 * 60)).await;
    assert_eq!(h.call_offsets(), vec![Duration::from_secs(60 * 60)]);
    assert_eq!(h.history.triggers(), vec![PingTrigger::Scheduled]);
    assert_eq!(h.next_fire_at(), Some(base() + minutes(120)));

    advance(Duration::from_secs(60 * 60)).await;
    assert_eq!(
        h.call_offsets(),
        vec![Duration::from_secs(60 * 60), Duration::from_secs(120 * 60)]
    );
    assert_eq!(h.history.events(), vec!["Scheduler started".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_ping_uses_configured_prompt_and_model() {
    let settings = ScheduleSettings {
        prompt: "ping".to_string(),
        model: "sonnet".to_string(),
        ..all_day(1)
    };
    let h = Harness::spawn(settings, ScriptedExecutor::succeeding());

    advance(Duration::from_secs(61)).await;
    let requests = h.executor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "ping");
    assert_eq!(requests[0].model, "sonnet");
}

#[tokio::test(start_paused = true)]
async fn test_disabled_scheduler_stays_idle() {
    let h = Harness::spawn(ScheduleSettings::default(), ScriptedExecutor::succeeding());

    advance(Duration::from_secs(24 * 3600)).await;
    let status = h.handle.status();
    assert!(!status.schedule.running);
    assert_eq!(status.schedule.phase, SchedulerPhase::Stopped);
    assert_eq!(status.schedule.next_fire_at, None);
    assert_eq!(h.executor.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reschedule_is_idempotent() {
    let h = Harness::spawn(all_day(60), ScriptedExecutor::succeeding());
    advance(Duration::from_secs(10 * 60)).await;

    h.handle.reschedule().unwrap();
    h.handle.reschedule().unwrap();
    settle().await;
    assert_eq!(h.next_fire_at(), Some(base() + minutes(60)));

    advance(Duration::from_secs(51 * 60)).await;
    assert_eq!(h.executor.calls(), 1);
    assert_eq!(h.call_offsets(), vec![Duration::from_secs(60 * 60)]);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_keeps_deadline() {
    let h = Harness::spawn(all_day(60), ScriptedExecutor::succeeding());
    advance(Duration::from_secs(5 * 60)).await;

    h.handle.start().unwrap();
    settle().await;
    assert_eq!(h.next_fire_at(), Some(base() + minutes(60)));
    assert_eq!(h.history.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_time_window_skips_until_window_opens() {
    let settings = ScheduleSettings {
        mode: ScheduleMode::TimeWindow,
        window_start: chrono::NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        window_end: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        ..all_day(180)
    };
    let h = Harness::spawn(settings, ScriptedExecutor::succeeding());
    settle().await;
    assert_eq!(h.next_fire_at(), Some(base() + minutes(180)));

    // 12:00 is outside 06:00-10:00: no ping, wait for tomorrow's opening
    advance(Duration::from_secs(180 * 60)).await;
    assert_eq!(h.executor.calls(), 0);
    let tomorrow_six = Utc.with_ymd_and_hms(2026, 3, 3, 6, 0, 0).unwrap();
    assert_eq!(h.next_fire_at(), Some(tomorrow_six));

    advance(Duration::from_secs(18 * 3600)).await;
    assert_eq!(h.executor.calls(), 1);
    assert_eq!(h.next_fire_at(), Some(tomorrow_six + minutes(180)));
}

#[tokio::test(start_paused = true)]
async fn test_settings_change_is_debounced() {
    let h = Harness::spawn(all_day(60), ScriptedExecutor::succeeding());
    advance(Duration::from_secs(10 * 60)).await;

    h.handle.update_settings(all_day(30)).unwrap();
    advance(Duration::from_millis(200)).await;
    h.handle.update_settings(all_day(45)).unwrap();
    advance(Duration::from_millis(300)).await;

    // The first edit's debounce was superseded by the second
    assert_eq!(h.next_fire_at(), Some(base() + minutes(60)));
    assert_eq!(h.handle.status().schedule.interval_minutes, 60);

    advance(Duration::from_millis(300)).await;
    let applied_at = base() + minutes(10) + chrono::Duration::milliseconds(700);
    assert_eq!(h.next_fire_at(), Some(applied_at + minutes(45)));
    assert_eq!(h.handle.status().schedule.interval_minutes, 45);
}

#[tokio::test(start_paused = true)]
async fn test_prompt_change_applies_without_reschedule() {
    let h = Harness::spawn(all_day(60), ScriptedExecutor::succeeding());
    advance(Duration::from_secs(10 * 60)).await;

    let settings = ScheduleSettings {
        prompt: "still here?".to_string(),
        ..all_day(60)
    };
    h.handle.update_settings(settings).unwrap();
    advance(Duration::from_secs(2)).await;
    assert_eq!(h.next_fire_at(), Some(base() + minutes(60)));

    advance(Duration::from_secs(50 * 60)).await;
    assert_eq!(h.executor.requests()[0].prompt, "still here?");
}

#[tokio::test(start_paused = true)]
async fn test_disabling_via_settings_stops() {
    let h = Harness::spawn(all_day(60), ScriptedExecutor::succeeding());
    settle().await;

    h.handle
        .update_settings(ScheduleSettings {
            enabled: false,
            ..all_day(60)
        })
        .unwrap();
    settle().await;

    let status = h.handle.status();
    assert!(!status.schedule.running);
    assert_eq!(status.schedule.next_fire_at, None);
    assert_eq!(
        h.history.events(),
        vec!["Scheduler started".to_string(), "Scheduler stopped".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_firing_records_without_rescheduling() {
    let executor = ScriptedExecutor::succeeding().with_delay(Duration::from_secs(30));
    let h = Harness::spawn(all_day(60), executor);

    advance(Duration::from_secs(60 * 60 + 10)).await;
    assert_eq!(h.handle.status().schedule.phase, SchedulerPhase::Firing);

    h.handle.stop().unwrap();
    advance(Duration::from_secs(60)).await;

    let status = h.handle.status();
    assert_eq!(h.history.triggers(), vec![PingTrigger::Scheduled]);
    assert!(!status.schedule.running);
    assert_eq!(status.schedule.phase, SchedulerPhase::Stopped);
    assert_eq!(status.schedule.next_fire_at, None);

    advance(Duration::from_secs(5 * 3600)).await;
    assert_eq!(h.executor.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_suspend_cancels_regular_deadline() {
    let h = Harness::spawn(all_day(60), ScriptedExecutor::succeeding());
    advance(Duration::from_secs(5 * 60)).await;

    h.handle.suspend().unwrap();
    advance(Duration::from_secs(2 * 3600)).await;
    assert!(h.handle.status().suspended);
    assert_eq!(h.executor.calls(), 0);

    h.handle.resume().unwrap();
    settle().await;
    let resumed_at = base() + minutes(125);
    assert!(!h.handle.status().suspended);
    assert_eq!(h.next_fire_at(), Some(resumed_at + minutes(60)));
}

#[tokio::test(start_paused = true)]
async fn test_startup_retries_network_failure() {
    let settings = ScheduleSettings {
        ping_on_startup: true,
        ..Default::default()
    };
    let executor = ScriptedExecutor::new(vec![Err("connection timed out".to_string()), Ok(())]);
    let h = Harness::spawn(settings, executor);

    advance(Duration::from_secs(11)).await;
    let retry = h.handle.status().retry.unwrap();
    assert_eq!(retry.context, RetryContext::Startup);
    assert_eq!(retry.attempt, 1);

    advance(Duration::from_secs(20)).await;
    assert_eq!(
        h.call_offsets(),
        vec![Duration::from_secs(10), Duration::from_secs(25)]
    );
    assert_eq!(
        h.history.triggers(),
        vec![PingTrigger::Startup, PingTrigger::Startup]
    );
    let attempts = h.history.attempts();
    assert!(!attempts[0].1.is_success());
    assert!(attempts[1].1.is_success());
    assert!(h
        .history
        .events()
        .iter()
        .any(|e| e.contains("retrying in 15s")));
    assert_eq!(h.handle.status().retry, None);
}

#[tokio::test(start_paused = true)]
async fn test_startup_gives_up_after_max_attempts() {
    let settings = ScheduleSettings {
        ping_on_startup: true,
        ..Default::default()
    };
    let failures = (0..6).map(|_| Err("network unreachable".to_string())).collect();
    let h = Harness::spawn(settings, ScriptedExecutor::new(failures));

    advance(Duration::from_secs(10 + 15 + 30 + 60 + 120 + 600)).await;
    assert_eq!(
        h.call_offsets(),
        vec![
            Duration::from_secs(10),
            Duration::from_secs(25),
            Duration::from_secs(55),
            Duration::from_secs(115),
            Duration::from_secs(235),
        ]
    );
    assert!(h
        .history
        .events()
        .iter()
        .any(|e| e.contains("gave up after 5 attempts")));
}

#[tokio::test(start_paused = true)]
async fn test_wake_auth_failure_does_not_retry() {
    let settings = ScheduleSettings {
        ping_on_wake: true,
        ..all_day(60)
    };
    let executor = ScriptedExecutor::new(vec![Err("invalid session key".to_string())]);
    let h = Harness::spawn(settings, executor);
    advance(Duration::from_secs(5 * 60)).await;

    h.handle.on_suspend();
    h.handle.on_resume();
    advance(Duration::from_secs(11)).await;

    assert_eq!(h.history.triggers(), vec![PingTrigger::Wake]);
    assert!(h
        .history
        .events()
        .iter()
        .any(|e| e.contains("non-network error")));
    let woke_at = base() + minutes(5) + chrono::Duration::seconds(10);
    assert_eq!(h.next_fire_at(), Some(woke_at + minutes(60)));

    advance(Duration::from_secs(5 * 60)).await;
    assert_eq!(h.executor.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_ping_coalesced_with_regular_ping() {
    let snapshot = UsageSnapshot::new(45.0, base()).with_reset_at(base() + minutes(59));
    let (monitor, source) = usage_monitor(Vec::new());
    monitor.publish(snapshot);
    let (events_tx, mut events_rx) = broadcast::channel(16);

    let h = Harness::spawn_with(
        all_day(60),
        ScriptedExecutor::succeeding(),
        Some(monitor),
        Some(events_tx),
    );
    settle().await;
    assert!(h.handle.status().reset_armed);

    advance(Duration::from_secs(61 * 60)).await;
    assert_eq!(h.history.triggers(), vec![PingTrigger::Scheduled]);
    // "Scheduler started" plus the regular attempt; nothing for the skipped reset
    assert_eq!(h.history.total(), 2);
    assert_eq!(source.calls(), 0);

    let mut saw_skip = false;
    while let Ok(event) = events_rx.try_recv() {
        if matches!(event, CoreEvent::ResetSkipped { .. }) {
            saw_skip = true;
        }
    }
    assert!(saw_skip);
}

#[tokio::test(start_paused = true)]
async fn test_reset_ping_confirmed() {
    let target = base() + minutes(30);
    let (monitor, source) = usage_monitor(vec![
        Ok(UsageSnapshot::new(82.0, base()).with_reset_at(target)),
        Ok(UsageSnapshot::new(5.0, base()).with_reset_at(target + minutes(300))),
    ]);
    monitor.publish(UsageSnapshot::new(80.0, base()).with_reset_at(target));

    let h = Harness::spawn_with(all_day(300), ScriptedExecutor::succeeding(), Some(monitor), None);
    settle().await;
    assert_eq!(h.handle.status().reset_target, Some(target));

    advance(Duration::from_secs(31 * 60)).await;
    assert_eq!(h.call_offsets(), vec![Duration::from_secs(30 * 60)]);
    assert_eq!(h.history.triggers(), vec![PingTrigger::Reset]);
    assert_eq!(source.calls(), 2);
    assert!(h
        .history
        .events()
        .iter()
        .any(|e| e == "Usage reset confirmed (80% -> 5%)"));
    assert!(!h.handle.status().reset_armed);
}

#[tokio::test(start_paused = true)]
async fn test_reset_ping_retries_until_drop() {
    let target = base() + minutes(30);
    let (monitor, source) = usage_monitor(vec![
        Ok(UsageSnapshot::new(80.0, base()).with_reset_at(target)),
        Ok(UsageSnapshot::new(78.0, base()).with_reset_at(target)),
        Ok(UsageSnapshot::new(78.0, base()).with_reset_at(target)),
        Ok(UsageSnapshot::new(10.0, base()).with_reset_at(target + minutes(300))),
    ]);
    monitor.publish(UsageSnapshot::new(80.0, base()).with_reset_at(target));

    let h = Harness::spawn_with(all_day(300), ScriptedExecutor::succeeding(), Some(monitor), None);
    advance(Duration::from_secs(32 * 60)).await;

    // Ping at the target, recheck 15s later, retry 30s after that
    assert_eq!(
        h.call_offsets(),
        vec![Duration::from_secs(30 * 60), Duration::from_secs(30 * 60 + 45)]
    );
    assert_eq!(
        h.history.triggers(),
        vec![PingTrigger::Reset, PingTrigger::Reset]
    );
    assert_eq!(source.calls(), 4);
    let events = h.history.events();
    assert!(events.iter().any(|e| e.contains("retry 1 of 3")));
    assert!(events.iter().any(|e| e.starts_with("Usage reset confirmed")));
    assert_eq!(h.handle.status().reset_retry_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_target_moved_by_pre_ping_refresh() {
    let old_target = base() + minutes(30);
    let new_target = base() + minutes(330);
    let (monitor, _source) = usage_monitor(vec![Ok(
        UsageSnapshot::new(80.0, base()).with_reset_at(new_target)
    )]);
    monitor.publish(UsageSnapshot::new(80.0, base()).with_reset_at(old_target));

    let h = Harness::spawn_with(
        all_day(600),
        ScriptedExecutor::succeeding().with_delay(Duration::from_secs(5)),
        Some(monitor),
        None,
    );
    advance(Duration::from_secs(40 * 60)).await;

    // The old target's ping ran once; no retries stole the new deadline
    let status = h.handle.status();
    assert_eq!(status.reset_target, Some(new_target));
    assert!(status.reset_armed);
    assert_eq!(status.reset_retry_count, 0);
    assert_eq!(h.call_offsets(), vec![Duration::from_secs(30 * 60)]);
    assert!(!h.history.events().iter().any(|e| e.contains("retry")));

    advance(Duration::from_secs(290 * 60 + 10)).await;
    assert_eq!(
        h.call_offsets(),
        vec![Duration::from_secs(30 * 60), Duration::from_secs(330 * 60)]
    );
    assert_eq!(h.history.triggers(), vec![PingTrigger::Reset, PingTrigger::Reset]);
}

#[tokio::test(start_paused = true)]
async fn test_low_utilization_does_not_arm_reset() {
    let (monitor, _source) = usage_monitor(Vec::new());
    monitor.publish(UsageSnapshot::new(12.0, base()).with_reset_at(base() + minutes(30)));

    let h = Harness::spawn_with(all_day(300), ScriptedExecutor::succeeding(), Some(monitor), None);
    advance(Duration::from_secs(40 * 60)).await;

    assert!(!h.handle.status().reset_armed);
    assert_eq!(h.executor.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_usage_update_arms_reset_while_running() {
    let (monitor, _source) = usage_monitor(Vec::new());
    let h = Harness::spawn_with(
        all_day(300),
        ScriptedExecutor::succeeding(),
        Some(monitor.clone()),
        None,
    );
    settle().await;
    assert!(!h.handle.status().reset_armed);

    let target = base() + minutes(90);
    monitor.publish(UsageSnapshot::new(55.0, base()).with_reset_at(target));
    settle().await;

    let status = h.handle.status();
    assert!(status.reset_armed);
    assert_eq!(status.reset_target, Some(target));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_handle() {
    let h = Harness::spawn(all_day(60), ScriptedExecutor::succeeding());
    h.handle.shutdown().unwrap();
    h.task.await.unwrap();

    assert!(matches!(h.handle.start(), Err(CoreError::SchedulerClosed)));
}
