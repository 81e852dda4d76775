//! Mutable state for one discovery run.
//!
//! Created empty at run start, folded stage by stage by the reducers in
//! `merge`, read out into the briefing at the end, then discarded. Every
//! stage sees only what completed predecessors wrote.

use std::collections::HashMap;
use std::sync::Arc;

use nichesignal_common::{
    AppOpportunity, PainPoint, PainPointCluster, SourceKind, SourceRecord, TrendValidation,
    UsageCounters,
};

use crate::pipeline::stats::DiscoveryStats;

/// The stage sequence. The four extract branches all live inside `Extract`;
/// they run concurrently and the stage completes only when all four have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collect,
    Extract,
    Filter,
    ScoreAndValidate,
    Rank,
    Done,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Extract => "extract",
            Stage::Filter => "filter",
            Stage::ScoreAndValidate => "score_and_validate",
            Stage::Rank => "rank",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Mutable run state, updated only by the `merge` reducers and the runner.
#[derive(Default)]
pub struct DiscoveryState {
    /// Raw collections, one slot per source.
    pub raw_records: HashMap<SourceKind, Vec<SourceRecord>>,

    /// Pain points accumulated across the extract branches. Additive merge:
    /// branches contribute disjoint lists, concatenated in source
    /// declaration order, never overwritten.
    pub pain_points: Vec<Arc<PainPoint>>,

    /// Output of the clustering pass, read-only afterward.
    pub clusters: Vec<PainPointCluster>,

    /// Filtered candidates.
    pub candidates: Vec<Arc<PainPoint>>,

    /// Demand validations keyed by search keyword.
    pub validations: HashMap<String, TrendValidation>,

    /// Ranked opportunities.
    pub opportunities: Vec<AppOpportunity>,

    /// Aggregated call counters across all stages and branches.
    pub usage: UsageCounters,

    /// Notes from branches that degraded to empty output.
    pub branch_errors: Vec<String>,

    /// Aggregated run metrics.
    pub stats: DiscoveryStats,
}

impl DiscoveryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_data_points(&self) -> u64 {
        self.raw_records.values().map(|v| v.len() as u64).sum()
    }
}
