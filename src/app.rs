//! The `run`, `status` and `history` commands.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use pingpace_core::api::{CoreEvent, PingPaceCoreBuilder};
use pingpace_core::history::{read_recent_events, HistoryEvent, HistoryLog};
use pingpace_core::ping::PingStatus;
use pingpace_core::velocity::{JsonSampleStore, SampleStore, VelocityReport};

use crate::config::Settings;
use crate::executor::CommandPingExecutor;
use crate::power::SleepDetector;
use crate::usage_source::CommandUsageSource;

/// Run the scheduler until Ctrl-C
pub async fn run(settings: Settings) -> Result<()> {
    let history_path = settings.history_path();
    let samples_path = settings.samples_path();
    info!(
        "History at {}, samples at {}",
        history_path.display(),
        samples_path.display()
    );

    let mut builder = PingPaceCoreBuilder::new(settings.schedule())
        .with_executor(Arc::new(CommandPingExecutor::from_settings(&settings.ping)))
        .with_history(Arc::new(HistoryLog::new(
            history_path,
            settings.history.max_size_bytes,
        )))
        .with_sample_store(Arc::new(JsonSampleStore::new(samples_path)))
        .with_poll_interval(Duration::from_secs(settings.usage.poll_interval_secs));
    match CommandUsageSource::from_settings(&settings.usage) {
        Some(source) => builder = builder.with_usage_source(Arc::new(source)),
        None => info!("No usage command configured; reset pings and velocity tracking are off"),
    }

    let core = builder.build().context("Failed to start the scheduler")?;
    core.start_polling();
    let detector = SleepDetector::default().spawn(Arc::new(core.scheduler().clone()));
    let mut events = core.subscribe();

    let status = core.schedule_status();
    match status.schedule.next_fire_at {
        Some(at) => info!("pingpace running, next ping at {}", at),
        None => info!("pingpace running, regular schedule disabled"),
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => log_event(&event, &core.velocity_report()),
                Err(RecvError::Lagged(skipped)) => debug!("Dropped {} core events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    detector.abort();
    core.shutdown().await;
    Ok(())
}

fn log_event(event: &CoreEvent, report: &VelocityReport) {
    match event {
        CoreEvent::ScheduleChanged { next_fire_at: Some(at) } => debug!("Next ping at {}", at),
        CoreEvent::ScheduleChanged { next_fire_at: None } => debug!("Regular schedule stopped"),
        CoreEvent::PingCompleted {
            trigger,
            status: PingStatus::Error,
            error,
        } => warn!(
            "{} ping failed: {}",
            trigger,
            error.as_deref().unwrap_or("unknown error")
        ),
        CoreEvent::PingCompleted { .. } => {}
        CoreEvent::ResetArmed { target } => debug!("Reset ping armed for {}", target),
        CoreEvent::ResetSkipped { .. } => {}
        CoreEvent::VelocityUpdated => {
            if let Some(advisory) = &report.advisory {
                info!(
                    "About {:.1}h left on {}; switching to {} would stretch it",
                    advisory.current_hours, advisory.current, advisory.suggested
                );
            }
        }
    }
}

/// Print velocity metrics from the stored samples
pub fn status(settings: &Settings, json: bool) -> Result<()> {
    let store = JsonSampleStore::new(settings.samples_path());
    let samples = store
        .load()
        .with_context(|| format!("Failed to load samples from {}", store.path().display()))?;
    let report = VelocityReport::from_samples(&samples);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

/// Print the most recent history entries
pub fn history(settings: &Settings, limit: usize) {
    for event in read_recent_events(&settings.history_path(), limit) {
        println!("{}", format_event(&event));
    }
}

fn rate(velocity: Option<f64>) -> String {
    velocity.map_or_else(|| "-".to_string(), |v| format!("{:.1}%/h", v))
}

/// Human-readable report
pub fn format_report(report: &VelocityReport) -> String {
    let mut out = String::new();
    if report.is_calculating() {
        let _ = writeln!(out, "Calculating... ({} samples)", report.sample_count);
        return out;
    }

    let _ = writeln!(
        out,
        "Session usage:    {:.1}%",
        report.current_utilization.unwrap_or_default()
    );
    let _ = writeln!(out, "Session velocity: {}", rate(report.session_velocity));
    let _ = writeln!(out, "7-day velocity:   {}", rate(report.weekly_velocity));
    let _ = writeln!(out, "All-time velocity: {}", rate(report.all_time_velocity));
    match (report.hours_remaining, report.estimated_exhaustion_at) {
        (Some(hours), Some(at)) => {
            let _ = writeln!(out, "Time remaining:   {:.1}h (until {})", hours, at.format("%H:%M UTC"));
        }
        _ => {
            let _ = writeln!(out, "Time remaining:   -");
        }
    }
    if let Some(model) = report.detected_model {
        let _ = writeln!(out, "Active model:     {}", model);
    }
    for projection in &report.projections {
        let hours = projection
            .hours_remaining
            .map_or_else(|| "-".to_string(), |h| format!("{:.1}h", h));
        let _ = writeln!(out, "  {:<8} {:>10}  {}", projection.model.as_str(), rate(Some(projection.velocity)), hours);
    }
    if let Some(advisory) = &report.advisory {
        let _ = writeln!(
            out,
            "Advisory: switch from {} to {} to stretch {:.1}h",
            advisory.current, advisory.suggested, advisory.current_hours
        );
    }
    out
}

/// One history line
pub fn format_event(event: &HistoryEvent) -> String {
    match event {
        HistoryEvent::PingAttempt {
            ts,
            trigger,
            status,
            duration_secs,
            error,
        } => {
            let status = match status {
                PingStatus::Success => "ok",
                PingStatus::Error => "error",
            };
            let mut line = format!(
                "{}  {:<9} {:<5} {:.1}s",
                ts.format("%Y-%m-%d %H:%M:%S"),
                trigger.as_str(),
                status,
                duration_secs
            );
            if let Some(error) = error {
                line.push_str("  ");
                line.push_str(error);
            }
            line
        }
        HistoryEvent::System { ts, message } => {
            format!("{}  {}", ts.format("%Y-%m-%d %H:%M:%S"), message)
        }
    }
}
