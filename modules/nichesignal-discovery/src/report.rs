//! The run's output artifact: ranked opportunities plus enough counters to
//! audit what the run cost and where it degraded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nichesignal_common::{AppOpportunity, PainPointCluster, TrendValidation, UsageCounters};

use crate::pipeline::state::DiscoveryState;

/// Estimated cost per operation in cents. Rounded up — budget reports
/// should err pessimistic.
pub struct OperationCost;

impl OperationCost {
    pub const LLM_CALL: u64 = 2;
    pub const EMBEDDING_BATCH: u64 = 1;
    pub const SERPAPI_CALL: u64 = 1;
    pub const APIFY_CALL: u64 = 3;
}

/// Digest of one cluster for downstream display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub representative: String,
    pub member_count: usize,
    pub total_engagement: i64,
    pub source_count: usize,
}

impl From<&PainPointCluster> for ClusterSummary {
    fn from(cluster: &PainPointCluster) -> Self {
        Self {
            representative: cluster.representative.clone(),
            member_count: cluster.members.len(),
            total_engagement: cluster.total_engagement,
            source_count: cluster.source_count(),
        }
    }
}

/// The weekly opportunity briefing consumed by the reporting layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityBriefing {
    pub generated_at: DateTime<Utc>,
    pub top_opportunities: Vec<AppOpportunity>,
    pub cluster_digest: Vec<ClusterSummary>,
    /// Every keyword validation from the run, for downstream display.
    pub trend_validations: Vec<TrendValidation>,
    pub total_data_points: u64,
    pub pain_points_extracted: u64,
    pub candidates_filtered: u64,
    pub keywords_validated: u64,
    pub usage: UsageCounters,
    pub estimated_cost_cents: u64,
    pub branch_errors: Vec<String>,
}

impl OpportunityBriefing {
    pub fn from_state(state: &DiscoveryState) -> Self {
        let mut trend_validations: Vec<TrendValidation> =
            state.validations.values().cloned().collect();
        trend_validations.sort_by(|a, b| {
            b.trend_score
                .cmp(&a.trend_score)
                .then_with(|| a.keyword.cmp(&b.keyword))
        });

        Self {
            generated_at: Utc::now(),
            top_opportunities: state.opportunities.clone(),
            cluster_digest: state.clusters.iter().map(ClusterSummary::from).collect(),
            trend_validations,
            total_data_points: state.total_data_points(),
            pain_points_extracted: state.stats.pain_points_extracted,
            candidates_filtered: state.stats.candidates_filtered,
            keywords_validated: state.stats.keywords_validated,
            usage: state.usage.clone(),
            estimated_cost_cents: estimate_cost_cents(&state.usage),
            branch_errors: state.branch_errors.clone(),
        }
    }
}

pub fn estimate_cost_cents(usage: &UsageCounters) -> u64 {
    usage.get("llm_calls") * OperationCost::LLM_CALL
        + usage.get("embedding_batches") * OperationCost::EMBEDDING_BATCH
        + usage.get("serpapi_calls") * OperationCost::SERPAPI_CALL
        + usage.get("x_calls") * OperationCost::APIFY_CALL
}

impl std::fmt::Display for OpportunityBriefing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Opportunity Briefing ({}) ===", self.generated_at.format("%Y-%m-%d"))?;
        writeln!(f, "Data points:     {}", self.total_data_points)?;
        writeln!(f, "Pain points:     {}", self.pain_points_extracted)?;
        writeln!(f, "Candidates:      {}", self.candidates_filtered)?;
        writeln!(f, "Validated:       {}", self.keywords_validated)?;
        writeln!(f, "Est. cost:       {}¢", self.estimated_cost_cents)?;
        if !self.branch_errors.is_empty() {
            writeln!(f, "Degraded:        {} branch(es)", self.branch_errors.len())?;
        }
        writeln!(f, "\nTop opportunities:")?;
        if self.top_opportunities.is_empty() {
            writeln!(f, "  (none found this cycle)")?;
        }
        for (i, opp) in self.top_opportunities.iter().enumerate() {
            writeln!(
                f,
                "  {}. [{}] {} — {}",
                i + 1,
                opp.opportunity_score,
                opp.app_concept,
                opp.problem
            )?;
            writeln!(
                f,
                "     demand {} / virality {} / buildability {} — \"{}\"",
                opp.demand_score, opp.virality_score, opp.buildability_score, opp.search_keyword
            )?;
        }
        Ok(())
    }
}
