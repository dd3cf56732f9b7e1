//! Service lifecycle adaptation: translates external start/stop control
//! signals into invocations of a wrapped [`Command`].
//!
//! The adapter itself is platform-neutral; [`SignalHost`] binds it to the
//! Unix convention of SIGTERM/SIGINT as the service-control channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::commands::{CancelToken, Command};
use crate::errors::{HostError, Result};

/// Lifecycle states of a supervised command. `Stopped` is terminal within
/// one process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    NotStarted,
    Running,
    Stopped,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::NotStarted => "not started",
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
        }
    }
}

/// Sink for buffered diagnostics. Drained exactly once, during stop.
pub trait DiagnosticSink: Send + Sync {
    fn flush(&self);
}

/// Flushes the standard streams: stdout carries the fmt subscriber's
/// output, stderr the operator-facing messages.
pub struct StdioSink;

impl DiagnosticSink for StdioSink {
    fn flush(&self) {
        use std::io::Write;
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

/// Drives a wrapped command from the external service-control protocol's two
/// signals, `on_start` and `on_stop`.
///
/// With a zero period, start triggers exactly one invocation; the command
/// runs to completion or until it observes cancellation, with no artificial
/// timeout. With a nonzero period, a single timer re-invokes the command at
/// that interval; a tick that fires while a prior invocation is still
/// running is skipped, so invocations never overlap.
pub struct LifecycleAdapter {
    command: Arc<dyn Command>,
    period: Duration,
    sink: Box<dyn DiagnosticSink>,
    cancel: CancelToken,
    busy: Arc<AtomicBool>,
    failed: Arc<watch::Sender<bool>>,
    state: Mutex<ServiceState>,
    runner: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl LifecycleAdapter {
    pub fn new(command: Arc<dyn Command>, period: Duration, sink: Box<dyn DiagnosticSink>) -> Self {
        let (failed, _) = watch::channel(false);
        Self {
            command,
            period,
            sink,
            cancel: CancelToken::new(),
            busy: Arc::new(AtomicBool::new(false)),
            failed: Arc::new(failed),
            state: Mutex::new(ServiceState::NotStarted),
            runner: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    /// Resolves once the wrapped command has failed. Hosts wait on this
    /// alongside their stop signal so a broken service is torn down
    /// immediately instead of sitting idle until an operator notices.
    pub async fn command_failed(&self) {
        let mut rx = self.failed.subscribe();
        let _ = rx.wait_for(|failed| *failed).await;
    }

    /// Start signal from the control channel. Execution moves to the
    /// blocking pool so the channel stays responsive to a stop request.
    /// Starting twice is a protocol violation.
    pub fn on_start(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ServiceState::NotStarted {
                return Err(HostError::Lifecycle(format!(
                    "start signalled while {}",
                    state.as_str()
                )));
            }
            *state = ServiceState::Running;
        }

        let command = self.command.clone();
        let cancel = self.cancel.clone();
        let busy = self.busy.clone();
        let failed = self.failed.clone();

        let handle = if self.period.is_zero() {
            info!("Start signalled; invoking command once");
            let invocation =
                tokio::task::spawn_blocking(move || run_invocation(&*command, &cancel));
            tokio::spawn(flag_failure(join_invocation(invocation), failed))
        } else {
            info!(
                "Start signalled; invoking command every {:?}",
                self.period
            );
            tokio::spawn(flag_failure(
                periodic_driver(command, self.period, cancel, busy),
                failed,
            ))
        };

        *self.runner.lock() = Some(handle);
        Ok(())
    }

    /// Stop signal from the control channel. Cancels the command
    /// (best-effort), waits for any in-flight invocation to finish, flushes
    /// the diagnostic sink, and reports the command's failure if there was
    /// one. Stopping before start, or twice, is a protocol violation.
    pub async fn on_stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ServiceState::Running {
                return Err(HostError::Lifecycle(format!(
                    "stop signalled while {}",
                    state.as_str()
                )));
            }
            *state = ServiceState::Stopped;
        }

        info!("Stop signalled; cancelling active command");
        self.cancel.cancel();

        let runner = self.runner.lock().take();
        let result = match runner {
            Some(handle) => join_invocation(handle).await,
            None => Ok(()),
        };

        // Stop cleanup happens regardless of how the command fared
        self.sink.flush();
        result
    }
}

fn run_invocation(command: &dyn Command, cancel: &CancelToken) -> Result<()> {
    let result = command.execute(cancel);
    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }
    result
}

async fn join_invocation(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(HostError::Lifecycle(format!("command task panicked: {}", e))),
    }
}

/// Run the runner future to completion and raise the failure flag if it
/// ends in an error, so hosts waiting on [`LifecycleAdapter::command_failed`]
/// wake up. The result itself still surfaces through `on_stop`.
async fn flag_failure(
    runner: impl std::future::Future<Output = Result<()>>,
    failed: Arc<watch::Sender<bool>>,
) -> Result<()> {
    let result = runner.await;
    if result.is_err() {
        failed.send_replace(true);
    }
    result
}

/// Single periodic timer re-invoking the command until cancelled. The first
/// tick fires immediately. A failed invocation stops the loop; its error
/// surfaces through `on_stop`.
async fn periodic_driver(
    command: Arc<dyn Command>,
    period: Duration,
    cancel: CancelToken,
    busy: Arc<AtomicBool>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<Result<()>>> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        if busy.load(Ordering::SeqCst) {
            debug!("Previous invocation still running; skipping tick");
            continue;
        }

        // The gate is free, so any previous invocation is done; reap it
        // before re-invoking. A failure ends the service rather than being
        // retried.
        if let Some(handle) = in_flight.take() {
            join_invocation(handle).await?;
        }

        // The driver is the only claimant of the gate, and it is claimed
        // before the task is spawned, so a tick can never observe a
        // not-yet-started invocation as idle.
        busy.store(true, Ordering::SeqCst);

        let command = command.clone();
        let cancel = cancel.clone();
        let busy = busy.clone();
        in_flight = Some(tokio::task::spawn_blocking(move || {
            let result = run_invocation(&*command, &cancel);
            busy.store(false, Ordering::SeqCst);
            result
        }));
    }

    match in_flight {
        Some(handle) => join_invocation(handle).await,
        None => Ok(()),
    }
}

/// Platform service-control loop. Implementations block inside `run` until
/// the service is stopped externally, driving the adapter's start and stop
/// signals; the caller does not get control back before the loop exits.
#[allow(async_fn_in_trait)]
pub trait LifecycleHost {
    async fn run(self, adapter: LifecycleAdapter) -> Result<()>;
}

/// Unix host: starts the adapter, parks until SIGTERM or SIGINT is
/// delivered or the command fails, then stops the adapter and returns the
/// stop result.
pub struct SignalHost;

impl LifecycleHost for SignalHost {
    async fn run(self, adapter: LifecycleAdapter) -> Result<()> {
        adapter.on_start()?;
        tokio::select! {
            result = wait_for_shutdown_signal() => result?,
            _ = adapter.command_failed() => {}
        }
        adapter.on_stop().await
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
