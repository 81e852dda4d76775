//! Pure reducers folding branch outputs into `DiscoveryState`.
//!
//! Merge rules per field: lists concatenate (in the order outputs are
//! given, which the runner fixes to source declaration order), usage
//! counters sum, labels overwrite, error notes append. No I/O here.

use std::sync::Arc;

use nichesignal_common::{PainPoint, SourceKind, SourceRecord, UsageCounters};

use crate::pipeline::state::DiscoveryState;
use crate::pipeline::stats::DiscoveryStats;

/// One collect branch's result.
pub struct CollectOutput {
    pub source: SourceKind,
    pub records: Vec<SourceRecord>,
    pub usage: UsageCounters,
    pub error: Option<String>,
}

/// One extract branch's result — a disjoint slice of the run's pain points.
pub struct ExtractOutput {
    pub source: SourceKind,
    pub pain_points: Vec<Arc<PainPoint>>,
    pub usage: UsageCounters,
    pub error: Option<String>,
}

pub fn merge_collect_outputs(state: &mut DiscoveryState, outputs: Vec<CollectOutput>) {
    for output in outputs {
        let idx = DiscoveryStats::source_index(output.source);
        state.stats.records_by_source[idx] += output.records.len() as u64;
        state.raw_records.entry(output.source).or_default().extend(output.records);
        state.usage.merge(&output.usage);
        if let Some(note) = output.error {
            state.stats.branches_degraded += 1;
            state.branch_errors.push(note);
        }
    }
}

pub fn merge_extract_outputs(state: &mut DiscoveryState, outputs: Vec<ExtractOutput>) {
    for output in outputs {
        state.stats.pain_points_extracted += output.pain_points.len() as u64;
        state.pain_points.extend(output.pain_points);
        state.usage.merge(&output.usage);
        if let Some(note) = output.error {
            state.stats.branches_degraded += 1;
            state.branch_errors.push(note);
        }
    }
}
