//! The sampling loop: repeated passes at a fixed interval, bounded by
//! wall-clock duration, by the lifetime of a launched child process, or by
//! operator interrupt.
//!
//! Execution is single-threaded and cooperative. Cancellation is observed
//! only at well-defined points: before a pass begins and during the
//! inter-pass sleep. An in-flight pass always completes, so the aggregation
//! state is never left partially mutated.

use crate::config::SamplerConfig;
use crate::filter::FilterConfig;
use crate::process::ProcessTable;
use crate::sampler::{AggregationState, Sampler};
use anyhow::{bail, Context};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

/// Loop lifecycle. `Draining` is terminal: the state handoff happens
/// exactly once, enforced by `run` consuming the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Draining,
}

/// Orchestrates repeated [`Sampler`] passes over a process table.
pub struct SamplingLoop<T: ProcessTable> {
    table: T,
    filter: FilterConfig,
    interval: Duration,
    duration: Option<Duration>,
    capture_background: bool,
    quiet: bool,
    child_bounded: bool,
    state: LoopState,
}

impl<T: ProcessTable> SamplingLoop<T> {
    pub fn new(table: T, config: &SamplerConfig) -> Self {
        Self {
            table,
            filter: config.filter.clone(),
            interval: config.interval,
            duration: config.duration,
            capture_background: config.background,
            quiet: config.quiet,
            child_bounded: false,
            state: LoopState::Idle,
        }
    }

    /// Stop as soon as a pass records no foreground match: the monitored
    /// child process has exited and left no trace in the table.
    pub fn bounded_by_child(mut self) -> Self {
        self.child_bounded = true;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs passes until a stop condition holds, then drains: the loop is
    /// consumed and the accumulated state handed to the caller exactly once.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) -> AggregationState {
        let mut agg = AggregationState::new();
        self.state = LoopState::Running;
        let started = Instant::now();
        debug!("sampling loop running, interval {:?}", self.interval);

        loop {
            if *cancel.borrow() {
                info!("cancellation requested before pass, stopping");
                break;
            }

            let matched = Sampler::new(&self.table, &self.filter, self.capture_background)
                .sample_once(&mut agg);
            if !self.quiet {
                info!(
                    "Sampling, total {} samples, press Ctrl+C to end sampling.",
                    agg.foreground().len()
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancelled(&mut cancel) => {
                    info!("cancellation requested during sleep, stopping");
                    break;
                }
            }

            if self.child_bounded && !matched {
                info!("no foreground match this pass, monitored process has exited");
                break;
            }
            if let Some(bound) = self.duration {
                if started.elapsed() >= bound {
                    info!("duration bound of {:?} reached after {} passes", bound, agg.passes());
                    break;
                }
            }
        }

        self.state = LoopState::Draining;
        debug!(
            "sampling loop draining: {} passes, {} foreground samples",
            agg.passes(),
            agg.foreground().len()
        );
        agg
    }
}

/// Resolves when cancellation is requested. Never resolves if the sender
/// side is gone without having requested it.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Launches the child command to be monitored. The child is never waited
/// on directly; its exit is observed by the loop as a pass with no
/// foreground match.
pub fn spawn_child(argv: &[String]) -> anyhow::Result<std::process::Child> {
    let (program, rest) = match argv.split_first() {
        Some(v) => v,
        None => bail!("child command is empty"),
    };
    let child = std::process::Command::new(program)
        .args(rest)
        .spawn()
        .with_context(|| format!("failed to launch child command '{program}'"))?;
    info!("launched child '{}' with pid {}", program, child.id());
    Ok(child)
}
