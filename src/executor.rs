//! Ping executor backed by the `claude` CLI (or any compatible command).

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use pingpace_core::ping::{PingAttemptOutcome, PingExecutor, PingRequest};

use crate::config::PingSettings;

/// Runs `<command> <args...> -p <prompt> --model <model>` once per attempt
pub struct CommandPingExecutor {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPingExecutor {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_settings(settings: &PingSettings) -> Self {
        Self::new(
            settings.command.clone(),
            settings.args.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

#[async_trait]
impl PingExecutor for CommandPingExecutor {
    async fn execute(&self, request: &PingRequest) -> PingAttemptOutcome {
        let started_at = Utc::now();
        let start = Instant::now();

        let child = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .args(["-p", &request.prompt, "--model", &request.model])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return PingAttemptOutcome::failure(
                    started_at,
                    start.elapsed().as_secs_f64(),
                    format!("failed to start {}: {}", self.command, e),
                );
            }
        };

        // Dropping the timed-out future drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return PingAttemptOutcome::failure(
                    started_at,
                    start.elapsed().as_secs_f64(),
                    format!("process error: {}", e),
                );
            }
            Err(_) => {
                return PingAttemptOutcome::failure(
                    started_at,
                    start.elapsed().as_secs_f64(),
                    format!("ping timed out after {}s", self.timeout.as_secs()),
                );
            }
        };

        let elapsed = start.elapsed().as_secs_f64();
        if output.status.success() {
            debug!("Ping command finished in {:.1}s", elapsed);
            return PingAttemptOutcome::success(started_at, elapsed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        let error = if detail.is_empty() {
            format!("exit {}", output.status)
        } else {
            detail.to_string()
        };
        PingAttemptOutcome::failure(started_at, elapsed, error)
    }
}
