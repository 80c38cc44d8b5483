//! memstat — process memory distribution sampler.
//!
//! Periodically snapshots the memory breakdown of every live process,
//! optionally restricted to a filtered subset (by command name, owning
//! user, or descent from a target process), and at termination renders
//! log-binned histograms of each memory kind plus a full audit log.
//!
//! The engine is built around a few small pieces:
//!
//! - [`process::ProcessTable`]: the snapshot source seam; `/proc` in
//!   production, a scripted table in tests
//! - [`filter::FilterConfig`]: three optional predicates under one AND/OR
//!   combine switch
//! - [`sampler::Sampler`]: one pass over the table, feeding
//!   [`sampler::AggregationState`]
//! - [`runner::SamplingLoop`]: repeated passes with interval sleeps and
//!   cooperative cancellation
//! - [`report::drain`]: the one-shot terminal handoff to the chart and log
//!   writers

pub mod ancestry;
pub mod cli;
pub mod config;
pub mod filter;
pub mod process;
pub mod report;
pub mod runner;
pub mod sampler;

// Re-export main types for convenience
pub use config::{ConfigError, SamplerConfig};
pub use filter::{CombineMode, FilterConfig};
pub use process::{MemoryInfo, MemoryKind, ProbeError, ProcessTable, ProcfsTable};
pub use report::{drain, DrainSummary, Histogram};
pub use runner::{LoopState, SamplingLoop};
pub use sampler::{AggregationState, Sampler};
