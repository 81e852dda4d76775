//! Opportunity scoring: one model call drafts keyword/concept/buildability,
//! then deterministic signals replace the model's guesses where ground truth
//! exists.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use ai_client::traits::CompletionAgent;
use ai_client::util::strip_code_blocks;
use nichesignal_common::{
    compose_score, normalize_engagement, AppOpportunity, PainPoint, PainPointCluster, SourceKind,
    SourceRecord, TrendValidation, UsageCounters,
};

use crate::parse::parse_piped_row;

/// Score assumed when the model omits or mangles a numeric field.
pub const DEFAULT_SCORE: u8 = 50;

/// Cap on similar-product matches attached to one opportunity.
const SIMILAR_PRODUCTS_CAP: usize = 5;

const SCORER_SYSTEM_PROMPT: &str = "You turn validated user pain points into small-app concepts. \
For each numbered problem, invent one focused app idea a solo developer could ship in weeks, \
a short search keyword people would actually google, and integer estimates in 0-100 for \
virality (how shareable) and buildability (how quickly shippable).";

/// One parsed scorer row. The model's virality field is ignored — observed
/// engagement overrides it downstream.
#[derive(Debug, Clone)]
pub struct DraftScore {
    pub index: usize,
    pub keyword: String,
    pub app_idea: String,
    pub buildability: u8,
}

#[derive(Debug, Default)]
pub struct DraftOutcome {
    pub drafts: Vec<DraftScore>,
    pub usage: UsageCounters,
    pub error: Option<String>,
}

pub struct OpportunityScorer {
    llm: Arc<dyn CompletionAgent>,
}

impl OpportunityScorer {
    pub fn new(llm: Arc<dyn CompletionAgent>) -> Self {
        Self { llm }
    }

    /// One model call over the numbered candidates. Rows come back as
    /// `INDEX | SEARCH_KEYWORD | APP_IDEA | VIRALITY | BUILDABILITY`; rows
    /// with fewer fields still yield a draft with default scores, rows with
    /// no keyword/idea are skipped.
    pub async fn draft(&self, candidates: &[Arc<PainPoint>]) -> DraftOutcome {
        let mut outcome = DraftOutcome::default();
        if candidates.is_empty() {
            return outcome;
        }

        let user_prompt = format!(
            "One line per problem, exactly this shape:\nINDEX | SEARCH_KEYWORD | APP_IDEA | VIRALITY | BUILDABILITY\n\n{}",
            format_candidates(candidates)
        );
        outcome.usage.record("llm_calls", 1);

        let response = match self.llm.complete(SCORER_SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Scorer call failed");
                outcome.error = Some(format!("opportunity scorer failed: {e}"));
                return outcome;
            }
        };

        for line in strip_code_blocks(&response).lines() {
            // Partial rows are salvageable down to INDEX | KEYWORD | IDEA.
            let row = match parse_piped_row(line, 3) {
                Ok(row) => row,
                Err(e) => {
                    debug!(line, error = %e, "Skipping unparseable scorer line");
                    continue;
                }
            };
            if row.index == 0 || row.index > candidates.len() {
                debug!(index = row.index, "Scorer index out of range, skipping");
                continue;
            }
            let keyword = row.fields[0].clone();
            let app_idea = row.fields[1].clone();
            if keyword.is_empty() || app_idea.is_empty() {
                continue;
            }

            outcome.drafts.push(DraftScore {
                index: row.index,
                keyword,
                app_idea,
                buildability: parse_score(row.fields.get(3)),
            });
        }

        info!(
            candidates = candidates.len(),
            drafts = outcome.drafts.len(),
            "Drafted opportunity scores"
        );
        outcome
    }
}

fn parse_score(field: Option<&String>) -> u8 {
    field
        .and_then(|f| f.trim().parse::<i64>().ok())
        .map(|v| v.clamp(0, 100) as u8)
        .unwrap_or(DEFAULT_SCORE)
}

fn format_candidates(candidates: &[Arc<PainPoint>]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}", i + 1, p.problem))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Combine drafts with demand validations, observed engagement, clusters,
/// and collected launch listings into final opportunities.
///
/// Pure assembly, no I/O:
/// - demand = the keyword's validated interest score (0 when unvalidated)
/// - virality = engagement normalized on the candidate's own source scale
/// - buildability = the model's estimate (no ground truth exists for it)
/// - contributing pain points = the candidate's cluster, or just itself
pub fn assemble_opportunities(
    drafts: &[DraftScore],
    candidates: &[Arc<PainPoint>],
    clusters: &[PainPointCluster],
    validations: &HashMap<String, TrendValidation>,
    raw_records: &HashMap<SourceKind, Vec<SourceRecord>>,
) -> Vec<AppOpportunity> {
    let launches = raw_records
        .get(&SourceKind::ProductHunt)
        .map(Vec::as_slice)
        .unwrap_or_default();

    drafts
        .iter()
        .filter_map(|draft| {
            let candidate = candidates.get(draft.index.checked_sub(1)?)?;
            let validation = validations.get(&draft.keyword);

            let demand = validation.map(|v| v.interest_score).unwrap_or(0);
            let virality = normalize_engagement(candidate.source, candidate.engagement);
            let buildability = draft.buildability;

            let pain_points = clusters
                .iter()
                .find(|c| c.members.iter().any(|m| m.id == candidate.id))
                .map(|c| c.members.clone())
                .unwrap_or_else(|| vec![candidate.clone()]);

            Some(AppOpportunity {
                problem: candidate.problem.clone(),
                app_concept: draft.app_idea.clone(),
                search_keyword: draft.keyword.clone(),
                demand_score: demand,
                virality_score: virality,
                buildability_score: buildability,
                opportunity_score: compose_score(demand, virality, buildability),
                pain_points,
                audience_tags: validation.map(|v| v.audience_tags.clone()).unwrap_or_default(),
                similar_products: similar_products(&draft.keyword, launches),
            })
        })
        .collect()
}

/// Launch listings whose copy mentions any meaningful keyword token —
/// cheap competing-product evidence from data already collected.
fn similar_products(keyword: &str, launches: &[SourceRecord]) -> Vec<String> {
    let tokens: Vec<String> = keyword
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.len() > 3)
        .map(str::to_string)
        .collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    launches
        .iter()
        .filter(|r| {
            let text = r.text.to_lowercase();
            tokens.iter().any(|t| text.contains(t))
        })
        .map(|r| r.text.lines().next().unwrap_or(&r.text).to_string())
        .take(SIMILAR_PRODUCTS_CAP)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pain_point, record, FailingCompletion, MockCompletion};

    fn candidates() -> Vec<Arc<PainPoint>> {
        vec![
            pain_point(SourceKind::Reddit, "expense reports are typed by hand", 50),
            pain_point(SourceKind::YouTube, "no tool tracks practice streaks", 0),
        ]
    }

    #[tokio::test]
    async fn parses_full_and_partial_rows() {
        let llm = Arc::new(MockCompletion::returning(
            "1 | expense tracker | SnapExpense | 80 | 90\n2 | practice streak app | StreakCoach",
        ));
        let scorer = OpportunityScorer::new(llm);

        let outcome = scorer.draft(&candidates()).await;
        assert_eq!(outcome.drafts.len(), 2);
        assert_eq!(outcome.drafts[0].buildability, 90);
        // Partial row takes the default for missing scores.
        assert_eq!(outcome.drafts[1].buildability, DEFAULT_SCORE);
    }

    #[tokio::test]
    async fn scorer_failure_is_empty_with_note() {
        let scorer = OpportunityScorer::new(Arc::new(FailingCompletion));
        let outcome = scorer.draft(&candidates()).await;
        assert!(outcome.drafts.is_empty());
        assert!(outcome.error.is_some());
    }

    #[test]
    fn assembly_overrides_virality_with_engagement() {
        let cands = candidates();
        let drafts = vec![
            DraftScore {
                index: 1,
                keyword: "expense tracker".into(),
                app_idea: "SnapExpense".into(),
                buildability: 90,
            },
            DraftScore {
                index: 2,
                keyword: "practice streak app".into(),
                app_idea: "StreakCoach".into(),
                buildability: 70,
            },
        ];

        let mut validations = HashMap::new();
        validations.insert(
            "expense tracker".to_string(),
            TrendValidation {
                interest_score: 60,
                ..TrendValidation::zero_signal("expense tracker")
            },
        );

        let opps = assemble_opportunities(&drafts, &cands, &[], &validations, &HashMap::new());
        assert_eq!(opps.len(), 2);

        // Reddit engagement 50 of 100 saturation → virality 50.
        assert_eq!(opps[0].demand_score, 60);
        assert_eq!(opps[0].virality_score, 50);
        assert_eq!(opps[0].opportunity_score, compose_score(60, 50, 90));

        // Zero engagement floors at 10; unvalidated keyword → demand 0.
        assert_eq!(opps[1].demand_score, 0);
        assert_eq!(opps[1].virality_score, 10);
        assert_eq!(opps[1].pain_points.len(), 1);
    }

    #[test]
    fn assembly_attaches_cluster_members_and_similar_products() {
        let cands = candidates();
        let sibling = pain_point(SourceKind::X, "expense reports again", 7);
        let cluster = PainPointCluster {
            representative: cands[0].problem.clone(),
            members: vec![cands[0].clone(), sibling],
            engagement_by_source: HashMap::from([(SourceKind::Reddit, 50), (SourceKind::X, 7)]),
            total_engagement: 57,
        };

        let mut raw_records = HashMap::new();
        raw_records.insert(
            SourceKind::ProductHunt,
            vec![
                record(SourceKind::ProductHunt, "Expensify Lite: expense reports on autopilot", 300),
                record(SourceKind::ProductHunt, "PlantPal: water reminders", 90),
            ],
        );

        let drafts = vec![DraftScore {
            index: 1,
            keyword: "expense tracker".into(),
            app_idea: "SnapExpense".into(),
            buildability: 80,
        }];

        let opps = assemble_opportunities(&drafts, &cands, &[cluster], &HashMap::new(), &raw_records);
        assert_eq!(opps[0].pain_points.len(), 2);
        assert_eq!(opps[0].similar_products.len(), 1);
        assert!(opps[0].similar_products[0].starts_with("Expensify Lite"));
    }

    #[test]
    fn out_of_range_draft_indices_are_dropped() {
        let drafts = vec![DraftScore {
            index: 9,
            keyword: "k".into(),
            app_idea: "a".into(),
            buildability: 50,
        }];
        let opps =
            assemble_opportunities(&drafts, &candidates(), &[], &HashMap::new(), &HashMap::new());
        assert!(opps.is_empty());
    }
}
