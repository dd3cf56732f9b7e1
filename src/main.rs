use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jobhost::commands::{CancelToken, CommandRegistry, Operation};
use jobhost::config::{self, Settings};
use jobhost::errors::{HostError, Result};
use jobhost::lifecycle::{LifecycleAdapter, LifecycleHost, SignalHost, StdioSink};

/// Jobhost - runs a named operation once or as a supervised service
#[derive(Parser, Debug)]
#[command(name = "jobhost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operation to run
    #[arg(short = 'p', long = "process", value_enum)]
    process: Operation,

    /// Run under the service lifecycle host instead of once in the foreground
    #[arg(long)]
    supervised: bool,

    /// Re-invocation interval while supervised ("30s", "5m"; a bare integer
    /// means seconds; "0s" runs once and holds open until stopped)
    #[arg(long, default_value = "0s", value_parser = config::parse_duration)]
    period: Duration,

    /// Path to the configuration file (searched upward from the current
    /// directory when omitted)
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = Settings::resolve_config_path(&cli.file)?;
    let settings = Settings::load(&config_path)?;

    // The sink must be live before any command is resolved or invoked
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        "{} {} starting (config {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    let registry = CommandRegistry::new(&settings);
    let command = registry.resolve(cli.process)?;

    if cli.supervised {
        info!(
            "Running {} supervised, period {}",
            cli.process.as_str(),
            config::format_duration(&cli.period)
        );
        let adapter = LifecycleAdapter::new(command, cli.period, Box::new(StdioSink));
        SignalHost.run(adapter).await
    } else {
        if !cli.period.is_zero() {
            warn!("--period only applies with --supervised; running once");
        }
        info!("Running {} in the foreground", cli.process.as_str());
        let cancel = CancelToken::new();
        tokio::task::spawn_blocking(move || command.execute(&cancel))
            .await
            .map_err(|e| HostError::Lifecycle(format!("command task panicked: {}", e)))?
    }
}
