//! memstat - version 0.1.0
//!
//! Process memory distribution sampler with tracing logging. This is the
//! main entry point: parses and validates the CLI surface, launches the
//! optional monitored child, runs the sampling loop until a stop condition
//! or interrupt, and drains the results to figures and logs.

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, Level};

use memstat::cli::{Args, LogLevel};
use memstat::config::SamplerConfig;
use memstat::process::ProcfsTable;
use memstat::runner::{spawn_child, SamplingLoop};
use memstat::drain;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Requests cancellation on the first SIGINT or SIGTERM. The in-flight
/// pass completes before the loop drains.
fn spawn_signal_watcher() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), finishing current pass...");
            }
            _ = terminate => {
                info!("Received SIGTERM, finishing current pass...");
            }
        }
        let _ = tx.send(true);
    });
    rx
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&args);

    let mut config = SamplerConfig::from_args(&args).map_err(|e| {
        eprintln!("❌ Configuration invalid: {e}");
        anyhow::anyhow!(e)
    })?;

    // A monitored child implies an ancestry filter rooted at its pid.
    let mut child = None;
    if let Some(argv) = config.child_command.clone() {
        let c = spawn_child(&argv)?;
        config.filter.ancestor_pid = c.id();
        child = Some(c);
    }
    let child_bounded = child.is_some();

    let cancel = spawn_signal_watcher();
    let mut looper = SamplingLoop::new(ProcfsTable::new(), &config);
    if child_bounded {
        looper = looper.bounded_by_child();
    }

    info!(
        "memstat sampling every {:?}{}",
        config.interval,
        config
            .duration
            .map(|d| format!(" for {d:?}"))
            .unwrap_or_default()
    );
    let state = looper.run(cancel).await;

    if let Some(mut c) = child {
        // Reap the child if it already exited; never block on a survivor.
        let _ = c.try_wait();
    }

    let summary = drain(&state, &config.output_dir)?;
    info!(
        "memstat finished: {} passes, {} charts, log at {}",
        state.passes(),
        summary.charts.len(),
        summary.log_path.display()
    );
    Ok(())
}
