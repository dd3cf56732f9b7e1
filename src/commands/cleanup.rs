use std::time::SystemTime;

use tracing::{debug, info};

use super::{CancelToken, Command};
use crate::config::CleanupSettings;
use crate::errors::{HostError, Result};

/// Deletes files directly under the configured directory whose modification
/// time is older than `max_age`. Subdirectories are left alone.
pub struct CleanupCommand {
    settings: CleanupSettings,
}

impl CleanupCommand {
    pub fn new(settings: CleanupSettings) -> Self {
        Self { settings }
    }
}

impl Command for CleanupCommand {
    fn execute(&self, cancel: &CancelToken) -> Result<()> {
        let dir = &self.settings.dir;
        if !dir.is_dir() {
            return Err(HostError::PathNotFound(dir.clone()));
        }

        let cutoff = SystemTime::now()
            .checked_sub(self.settings.max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0usize;
        for entry in std::fs::read_dir(dir)? {
            // Polled per entry so a stop request interrupts long scans
            if cancel.is_cancelled() {
                debug!("Cleanup interrupted by stop request");
                break;
            }

            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            if metadata.modified()? < cutoff {
                std::fs::remove_file(entry.path())?;
                debug!("Removed {}", entry.path().display());
                removed += 1;
            }
        }

        info!("Cleanup removed {} file(s) from {}", removed, dir.display());
        Ok(())
    }
}
