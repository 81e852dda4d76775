//! The discovery orchestrator.
//!
//! `state` holds the typed run state, `merge` the pure reducers that fold
//! branch outputs into it, `runner` the staged control flow, `stats` the
//! run summary.

pub mod merge;
pub mod runner;
pub mod state;
pub mod stats;

pub use runner::{DiscoveryDeps, DiscoveryPipeline, PipelineConfig};
pub use state::{DiscoveryState, Stage};
pub use stats::DiscoveryStats;
