use tracing::info;

use super::{CancelToken, Command};
use crate::config::ReportSettings;
use crate::errors::{HostError, Result};

/// Logs a file count and total size for the configured directory. Read-only.
pub struct ReportCommand {
    settings: ReportSettings,
}

impl ReportCommand {
    pub fn new(settings: ReportSettings) -> Self {
        Self { settings }
    }
}

impl Command for ReportCommand {
    fn execute(&self, cancel: &CancelToken) -> Result<()> {
        let dir = &self.settings.dir;
        if !dir.is_dir() {
            return Err(HostError::PathNotFound(dir.clone()));
        }

        let mut files = 0u64;
        let mut bytes = 0u64;
        for entry in std::fs::read_dir(dir)? {
            if cancel.is_cancelled() {
                break;
            }

            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files += 1;
                bytes += metadata.len();
            }
        }

        info!("{}: {} file(s), {} bytes", dir.display(), files, bytes);
        Ok(())
    }
}
