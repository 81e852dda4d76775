//! Seams the pipeline is wired through. Production impls live in
//! `sources.rs`, `embedder.rs`, and the trends crate; mocks in `testing.rs`.

use async_trait::async_trait;

use nichesignal_common::{SourceKind, SourceRecord, TrendValidation, UsageCounters};

use crate::sources::CollectPlan;

/// One content source the collect stage fans out over.
#[async_trait]
pub trait RecordSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch and normalize records for this source. Partial results are
    /// fine; `Err` means the source produced nothing usable this cycle.
    async fn collect(&self, plan: &CollectPlan) -> anyhow::Result<Vec<SourceRecord>>;

    /// External calls made, for budget reporting.
    fn calls_made(&self) -> u64;
}

/// Demand validation for scorer keywords.
#[async_trait]
pub trait DemandValidator: Send + Sync {
    /// Validate keywords concurrently, preserving input order. Infallible
    /// by contract — unreachable data comes back as zero-signal.
    async fn validate_batch(&self, keywords: &[String]) -> Vec<TrendValidation>;

    /// Per-provider call counts for the run report.
    fn usage(&self) -> UsageCounters {
        UsageCounters::default()
    }
}

#[async_trait]
impl DemandValidator for nichesignal_trends::TrendValidator {
    async fn validate_batch(&self, keywords: &[String]) -> Vec<TrendValidation> {
        nichesignal_trends::TrendValidator::validate_batch(self, keywords).await
    }

    fn usage(&self) -> UsageCounters {
        nichesignal_trends::TrendValidator::usage(self)
    }
}
