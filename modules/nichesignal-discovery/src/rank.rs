use nichesignal_common::AppOpportunity;

pub const DEFAULT_TOP_N: usize = 20;

/// Stable sort by opportunity score, descending, truncated to `top_n`.
/// Equal scores keep their original relative order.
pub fn rank_opportunities(
    mut opportunities: Vec<AppOpportunity>,
    top_n: usize,
) -> Vec<AppOpportunity> {
    opportunities.sort_by(|a, b| b.opportunity_score.cmp(&a.opportunity_score));
    opportunities.truncate(top_n);
    opportunities
}
