use std::fs::OpenOptions;
use std::io::Write;

use chrono::Utc;
use tracing::info;

use super::{CancelToken, Command};
use crate::config::HeartbeatSettings;
use crate::errors::Result;

/// Appends a UTC-timestamped line to the configured heartbeat file.
pub struct HeartbeatCommand {
    settings: HeartbeatSettings,
}

impl HeartbeatCommand {
    pub fn new(settings: HeartbeatSettings) -> Self {
        Self { settings }
    }
}

impl Command for HeartbeatCommand {
    fn execute(&self, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.settings.file)?;
        writeln!(file, "{} alive", Utc::now().to_rfc3339())?;

        info!("Heartbeat written to {}", self.settings.file.display());
        Ok(())
    }
}
