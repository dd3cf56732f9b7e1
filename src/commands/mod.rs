//! The `Command` abstraction, the closed set of operations, and the
//! startup-time registry mapping one to the other.

mod cleanup;
mod heartbeat;
mod report;

pub use cleanup::CleanupCommand;
pub use heartbeat::HeartbeatCommand;
pub use report::ReportCommand;

use std::collections::HashMap;
use std::sync::Arc;

use clap::ValueEnum;
use tokio::sync::watch;

use crate::config::Settings;
use crate::errors::{HostError, Result};

/// Operation selectable with `--process`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Operation {
    /// Append a timestamped line to the configured heartbeat file
    Heartbeat,
    /// Delete files older than the configured age from a directory
    Cleanup,
    /// Log a file-count and total-size summary of a directory
    Report,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Heartbeat => "heartbeat",
            Operation::Cleanup => "cleanup",
            Operation::Report => "report",
        }
    }
}

/// Cooperative cancellation flag shared between the lifecycle adapter and a
/// running command. Commands poll [`CancelToken::is_cancelled`] at convenient
/// points; a command that never polls runs to completion.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called (immediately if it already was)
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender half lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A pluggable unit of work with a single synchronous entry point.
///
/// `execute` runs to completion or failure on the calling thread. The core
/// makes no reentrancy assumption beyond "callable once per lifecycle";
/// commands that can run for a long time should poll the token so a stop
/// request interrupts them.
pub trait Command: Send + Sync {
    fn execute(&self, cancel: &CancelToken) -> Result<()>;
}

type Constructor = Box<dyn Fn() -> Arc<dyn Command> + Send + Sync>;

/// Explicit startup-time table mapping each operation to a command
/// constructor. Resolving an operation with no entry fails with
/// [`HostError::UnknownOperation`] rather than silently doing nothing.
pub struct CommandRegistry {
    table: HashMap<Operation, Constructor>,
}

impl CommandRegistry {
    /// Build the full registry, wiring every operation to its command.
    /// Construction-time dependencies come from `settings`; callers only
    /// ever see the resolved command.
    pub fn new(settings: &Settings) -> Self {
        let mut registry = Self::empty();

        let heartbeat = settings.heartbeat.clone();
        registry.register(Operation::Heartbeat, move || {
            Arc::new(HeartbeatCommand::new(heartbeat.clone())) as Arc<dyn Command>
        });

        let cleanup = settings.cleanup.clone();
        registry.register(Operation::Cleanup, move || {
            Arc::new(CleanupCommand::new(cleanup.clone())) as Arc<dyn Command>
        });

        let report = settings.report.clone();
        registry.register(Operation::Report, move || {
            Arc::new(ReportCommand::new(report.clone())) as Arc<dyn Command>
        });

        registry
    }

    /// A registry with nothing wired up. Useful for embedding a custom
    /// command set.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, operation: Operation, constructor: F)
    where
        F: Fn() -> Arc<dyn Command> + Send + Sync + 'static,
    {
        self.table.insert(operation, Box::new(constructor));
    }

    /// Resolve an operation to a freshly constructed command. No side
    /// effects beyond construction.
    pub fn resolve(&self, operation: Operation) -> Result<Arc<dyn Command>> {
        match self.table.get(&operation) {
            Some(constructor) => Ok(constructor()),
            None => Err(HostError::UnknownOperation(operation.as_str().to_string())),
        }
    }
}

#[cfg(test)]
mod tests;
