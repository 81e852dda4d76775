//! Staged control flow for a discovery run.
//!
//! Collect → {ExtractReddit, ExtractX, ExtractYouTube, ExtractProductHunt}
//! → Filter → ScoreAndValidate → Rank → Done. The extract branches run
//! concurrently and join before Filter starts; each contributes a disjoint
//! pain-point slice merged in source declaration order. No branch error
//! crosses this boundary — branches degrade to empty output plus a note,
//! and an entirely empty run still produces a briefing.

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tracing::{info, warn};

use ai_client::traits::CompletionAgent;
use nichesignal_common::{SourceKind, SourceRecord, TextEmbedder, UsageCounters};

use crate::cluster::{ClusterEngine, DEFAULT_SIMILARITY_THRESHOLD};
use crate::extract::PainPointExtractor;
use crate::filter::{CandidateFilter, DEFAULT_MAX_CANDIDATES};
use crate::pipeline::merge::{
    merge_collect_outputs, merge_extract_outputs, CollectOutput, ExtractOutput,
};
use crate::pipeline::state::{DiscoveryState, Stage};
use crate::rank::{rank_opportunities, DEFAULT_TOP_N};
use crate::report::OpportunityBriefing;
use crate::score::{assemble_opportunities, OpportunityScorer};
use crate::sources::CollectPlan;
use crate::traits::{DemandValidator, RecordSource};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_candidates: usize,
    pub top_n: usize,
    pub similarity_threshold: f32,
    /// Scales the collect plan down without changing control flow.
    pub test_mode: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            top_n: DEFAULT_TOP_N,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            test_mode: false,
        }
    }
}

pub struct DiscoveryDeps {
    /// Fan-out order follows this list; production wiring passes sources in
    /// `SourceKind::ALL` order.
    pub sources: Vec<Arc<dyn RecordSource>>,
    pub llm: Arc<dyn CompletionAgent>,
    pub embedder: Arc<dyn TextEmbedder>,
    pub validator: Arc<dyn DemandValidator>,
}

pub struct DiscoveryPipeline {
    deps: DiscoveryDeps,
    config: PipelineConfig,
}

impl DiscoveryPipeline {
    pub fn new(deps: DiscoveryDeps, config: PipelineConfig) -> Self {
        Self { deps, config }
    }

    /// Run the full pipeline. Errors only on unrecoverable setup problems;
    /// "nothing found this cycle" is a successful empty briefing.
    pub async fn run(&self) -> Result<OpportunityBriefing> {
        if self.deps.sources.is_empty() {
            anyhow::bail!("no content sources configured");
        }

        let mut state = DiscoveryState::new();
        let plan = if self.config.test_mode {
            CollectPlan::scaled_down()
        } else {
            CollectPlan::standard()
        };

        self.collect(&mut state, &plan).await;
        self.extract(&mut state).await;
        self.cluster(&mut state).await;
        self.filter(&mut state).await;
        self.score_and_validate(&mut state).await;
        self.rank(&mut state);

        info!(stage = %Stage::Done, "{}", state.stats);

        for source in &self.deps.sources {
            state.usage.record(
                &format!("{}_calls", source.kind().label()),
                source.calls_made(),
            );
        }
        Ok(OpportunityBriefing::from_state(&state))
    }

    async fn collect(&self, state: &mut DiscoveryState, plan: &CollectPlan) {
        info!(stage = %Stage::Collect, sources = self.deps.sources.len(), "Stage started");

        let outputs = join_all(self.deps.sources.iter().map(|source| async move {
            match source.collect(plan).await {
                Ok(records) => CollectOutput {
                    source: source.kind(),
                    records,
                    usage: UsageCounters::default(),
                    error: None,
                },
                Err(e) => {
                    warn!(source = %source.kind(), error = %e, "Collect branch degraded to empty");
                    CollectOutput {
                        source: source.kind(),
                        records: Vec::new(),
                        usage: UsageCounters::default(),
                        error: Some(format!("{} collect failed: {e}", source.kind())),
                    }
                }
            }
        }))
        .await;

        merge_collect_outputs(state, outputs);
        info!(stage = %Stage::Collect, records = state.total_data_points(), "Stage completed");
    }

    /// The four extract branches: disjoint per-source slices, all awaited
    /// before anything downstream reads the pain-point list.
    async fn extract(&self, state: &mut DiscoveryState) {
        info!(stage = %Stage::Extract, "Stage started");
        let extractor = PainPointExtractor::new(self.deps.llm.clone());

        let outputs = {
            let branches: Vec<(SourceKind, &[SourceRecord])> = SourceKind::ALL
                .iter()
                .map(|kind| {
                    (
                        *kind,
                        state
                            .raw_records
                            .get(kind)
                            .map(Vec::as_slice)
                            .unwrap_or_default(),
                    )
                })
                .collect();

            join_all(branches.into_iter().map(|(kind, records)| {
                let extractor = &extractor;
                async move {
                    let outcome = extractor.extract(kind, records).await;
                    ExtractOutput {
                        source: kind,
                        pain_points: outcome.pain_points,
                        usage: outcome.usage,
                        error: outcome.error,
                    }
                }
            }))
            .await
        };

        merge_extract_outputs(state, outputs);
        info!(stage = %Stage::Extract, pain_points = state.pain_points.len(), "Stage completed");
    }

    async fn cluster(&self, state: &mut DiscoveryState) {
        let engine = ClusterEngine::new(self.deps.embedder.clone())
            .with_threshold(self.config.similarity_threshold);
        if !state.pain_points.is_empty() {
            state.usage.record("embedding_batches", 1);
        }
        state.clusters = engine.cluster(&state.pain_points).await;
        state.stats.clusters_formed = state.clusters.len() as u64;
    }

    async fn filter(&self, state: &mut DiscoveryState) {
        info!(stage = %Stage::Filter, "Stage started");
        let filter = CandidateFilter::new(self.deps.llm.clone())
            .with_max_candidates(self.config.max_candidates);

        let outcome = filter.filter(&state.pain_points).await;
        state.usage.merge(&outcome.usage);
        if let Some(note) = outcome.error {
            state.branch_errors.push(note);
        }
        state.candidates = outcome.candidates;
        state.stats.candidates_filtered = state.candidates.len() as u64;
        info!(stage = %Stage::Filter, candidates = state.candidates.len(), "Stage completed");
    }

    async fn score_and_validate(&self, state: &mut DiscoveryState) {
        info!(stage = %Stage::ScoreAndValidate, "Stage started");
        let scorer = OpportunityScorer::new(self.deps.llm.clone());

        let draft_outcome = scorer.draft(&state.candidates).await;
        state.usage.merge(&draft_outcome.usage);
        if let Some(note) = draft_outcome.error {
            state.branch_errors.push(note);
        }

        // One validation per distinct keyword, in draft order.
        let mut keywords: Vec<String> = Vec::new();
        for draft in &draft_outcome.drafts {
            if !keywords.contains(&draft.keyword) {
                keywords.push(draft.keyword.clone());
            }
        }

        let validations = self.deps.validator.validate_batch(&keywords).await;
        state.stats.keywords_validated = validations.len() as u64;
        for validation in validations {
            state.validations.insert(validation.keyword.clone(), validation);
        }
        state.usage.merge(&self.deps.validator.usage());

        state.opportunities = assemble_opportunities(
            &draft_outcome.drafts,
            &state.candidates,
            &state.clusters,
            &state.validations,
            &state.raw_records,
        );
        info!(
            stage = %Stage::ScoreAndValidate,
            opportunities = state.opportunities.len(),
            "Stage completed"
        );
    }

    fn rank(&self, state: &mut DiscoveryState) {
        state.opportunities =
            rank_opportunities(std::mem::take(&mut state.opportunities), self.config.top_n);
        state.stats.opportunities_ranked = state.opportunities.len() as u64;
        info!(stage = %Stage::Rank, kept = state.opportunities.len(), "Stage completed");
    }
}
