//! Settings loading for jobhost.
//!
//! The base file `jobhost.yaml` is required; a sibling `jobhost.local.yaml`
//! overlays it section by section when present. Durations are strings like
//! "10s", "5m", "1h" (a bare integer means seconds).

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{HostError, Result};

pub const BASE_FILE: &str = "jobhost.yaml";
pub const LOCAL_FILE: &str = "jobhost.local.yaml";

/// Parse duration string (e.g., "10s", "5m", "1h", "100ms")
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty duration string".to_string());
    }

    // Find where the number ends and the unit begins
    let (num_str, unit) = s
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| s.split_at(i))
        .unwrap_or((s, "s")); // Default to seconds if no unit

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    let multiplier = match unit.to_lowercase().as_str() {
        "ms" => 1,
        "s" | "" => 1000,
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        _ => return Err(format!("Unknown duration unit: {}", unit)),
    };

    let millis = num
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration value too large: {}", s))?;
    Ok(Duration::from_millis(millis))
}

/// Format duration as string (e.g., "10s", "5m", "1h", "100ms")
pub fn format_duration(duration: &Duration) -> String {
    let millis = duration.as_millis() as u64;

    if millis == 0 {
        return "0s".to_string();
    }

    // Use the largest unit that divides evenly
    if millis % (60 * 60 * 1000) == 0 {
        format!("{}h", millis / (60 * 60 * 1000))
    } else if millis % (60 * 1000) == 0 {
        format!("{}m", millis / (60 * 1000))
    } else if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

/// Deserialize duration from string like "10s", "5m", "1h"
fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

/// Root settings, one section per concern plus one per operation.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub log: LogSettings,
    pub heartbeat: HeartbeatSettings,
    pub cleanup: CleanupSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSettings {
    /// Tracing filter directive, e.g. "info" or "jobhost=debug"
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatSettings {
    /// File the heartbeat line is appended to
    #[serde(default = "default_heartbeat_file")]
    pub file: PathBuf,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            file: default_heartbeat_file(),
        }
    }
}

fn default_heartbeat_file() -> PathBuf {
    PathBuf::from("jobhost-heartbeat.log")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupSettings {
    /// Directory whose direct entries are considered for deletion
    #[serde(default = "default_work_dir")]
    pub dir: PathBuf,

    /// Files modified longer ago than this are deleted
    #[serde(default = "default_max_age", deserialize_with = "deserialize_duration")]
    pub max_age: Duration,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            dir: default_work_dir(),
            max_age: default_max_age(),
        }
    }
}

fn default_max_age() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSettings {
    /// Directory summarized by the report operation
    #[serde(default = "default_work_dir")]
    pub dir: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            dir: default_work_dir(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

/// On-disk shape: every section optional so the local overlay can carry any
/// subset. Missing sections fall back to defaults in `finish`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    log: Option<LogSettings>,
    heartbeat: Option<HeartbeatSettings>,
    cleanup: Option<CleanupSettings>,
    report: Option<ReportSettings>,
}

impl RawSettings {
    /// Sections present in `other` replace the corresponding base section.
    fn overlay(&mut self, other: RawSettings) {
        if other.log.is_some() {
            self.log = other.log;
        }
        if other.heartbeat.is_some() {
            self.heartbeat = other.heartbeat;
        }
        if other.cleanup.is_some() {
            self.cleanup = other.cleanup;
        }
        if other.report.is_some() {
            self.report = other.report;
        }
    }

    fn finish(self) -> Settings {
        Settings {
            log: self.log.unwrap_or_default(),
            heartbeat: self.heartbeat.unwrap_or_default(),
            cleanup: self.cleanup.unwrap_or_default(),
            report: self.report.unwrap_or_default(),
        }
    }
}

impl Settings {
    /// Load the base file (required) and overlay the sibling local file
    /// when it exists.
    pub fn load(path: &Path) -> Result<Settings> {
        let text = read_config_file(path)?;
        let mut raw = parse_settings(path, &text)?;

        let local_path = path.with_file_name(LOCAL_FILE);
        if local_path.exists() {
            let local_text = std::fs::read_to_string(&local_path)?;
            raw.overlay(parse_settings(&local_path, &local_text)?);
        }

        Ok(raw.finish())
    }

    /// Find the jobhost configuration file in the current or parent directories
    pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            let candidate = current.join(BASE_FILE);
            if candidate.exists() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve config path from CLI option or search in current directory
    pub fn resolve_config_path(file: &Option<String>) -> Result<PathBuf> {
        match file {
            Some(path) => Ok(PathBuf::from(path)),
            None => {
                let cwd = std::env::current_dir()?;
                Settings::find_config_file(&cwd)
                    .ok_or_else(|| HostError::ConfigNotFound(PathBuf::from(BASE_FILE)))
            }
        }
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            HostError::ConfigNotFound(path.to_path_buf())
        } else {
            HostError::Io(e)
        }
    })
}

fn parse_settings(path: &Path, text: &str) -> Result<RawSettings> {
    // An empty or comment-only file is a valid "all defaults" config
    if text.trim().is_empty() {
        return Ok(RawSettings::default());
    }

    let de = serde_yaml::Deserializer::from_str(text);
    serde_path_to_error::deserialize(de).map_err(|e| HostError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}
