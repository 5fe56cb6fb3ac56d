//! Usage source that runs a shell command and parses what it prints.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Local, Utc};
use tracing::debug;

use pingpace_core::usage::{parse_usage_output, UsageSnapshot, UsageSource};

use crate::config::UsageSettings;

/// Runs `sh -c <command>`; stdout is a JSON snapshot or `/usage` text
pub struct CommandUsageSource {
    command: String,
    timeout: Duration,
}

impl CommandUsageSource {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    /// `None` when no usage command is configured
    pub fn from_settings(settings: &UsageSettings) -> Option<Self> {
        settings
            .command
            .as_ref()
            .filter(|command| !command.trim().is_empty())
            .map(|command| Self::new(command.clone(), Duration::from_secs(settings.timeout_secs)))
    }
}

/// Interpret command output: JSON first, then `/usage` text
pub fn parse_command_output(stdout: &str) -> Result<UsageSnapshot> {
    let trimmed = stdout.trim();
    if trimmed.starts_with('{') {
        let mut snapshot: UsageSnapshot =
            serde_json::from_str(trimmed).context("Failed to parse usage JSON")?;
        if snapshot.fetched_at > Utc::now() {
            snapshot.fetched_at = Utc::now();
        }
        return Ok(snapshot);
    }

    match parse_usage_output(trimmed, Local::now()) {
        Some(snapshot) => Ok(snapshot),
        None => bail!("Usage output contained no session meter"),
    }
}

#[async_trait]
impl UsageSource for CommandUsageSource {
    async fn fetch(&self) -> Result<UsageSnapshot> {
        let child = tokio::process::Command::new("sh")
            .args(["-c", &self.command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run usage command: {}", self.command))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| format!("Usage command timed out after {}s", self.timeout.as_secs()))?
            .context("Usage command failed")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Usage command exited with {}: {}", output.status, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let snapshot = parse_command_output(&stdout)?;
        debug!(
            "Usage command: session {:.1}%, reset {:?}",
            snapshot.session_utilization, snapshot.session_reset_at
        );
        Ok(snapshot)
    }
}
