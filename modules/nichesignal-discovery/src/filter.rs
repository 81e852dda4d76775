//! Single-call narrowing of raw pain points to an actionable candidate set.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use ai_client::traits::CompletionAgent;
use ai_client::util::strip_code_blocks;
use nichesignal_common::{PainPoint, UsageCounters};

use crate::parse::parse_piped_row;

pub const DEFAULT_MAX_CANDIDATES: usize = 45;

const FILTER_SYSTEM_PROMPT: &str = "You triage user pain points for app-opportunity research. \
Keep problems that are concrete, recurring, and plausibly solvable by a small software product. \
Drop vague venting, one-off incidents, and problems already dominated by entrenched tools.";

#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub candidates: Vec<Arc<PainPoint>>,
    pub usage: UsageCounters,
    pub error: Option<String>,
}

pub struct CandidateFilter {
    llm: Arc<dyn CompletionAgent>,
    max_candidates: usize,
}

impl CandidateFilter {
    pub fn new(llm: Arc<dyn CompletionAgent>) -> Self {
        Self {
            llm,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }

    /// Narrow pain points to at most `max_candidates`.
    ///
    /// The model answers with `INDEX | PROBLEM` lines; indices map back to
    /// the input slice, out-of-range or malformed lines are skipped. If the
    /// call fails, filtering degrades to plain truncation — never to zero
    /// output.
    pub async fn filter(&self, points: &[Arc<PainPoint>]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        if points.is_empty() {
            return outcome;
        }

        let user_prompt = format!(
            "Pick the strongest candidates, at most {}. Answer with one line per pick:\nINDEX | PROBLEM\n\n{}",
            self.max_candidates,
            format_points(points)
        );
        outcome.usage.record("llm_calls", 1);

        let response = match self.llm.complete(FILTER_SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Filter call failed, truncating instead");
                outcome.error = Some(format!("candidate filter failed: {e}"));
                outcome.candidates = points[..points.len().min(self.max_candidates)].to_vec();
                return outcome;
            }
        };

        let mut seen: HashSet<usize> = HashSet::new();
        for line in strip_code_blocks(&response).lines() {
            if outcome.candidates.len() >= self.max_candidates {
                break;
            }
            let row = match parse_piped_row(line, 2) {
                Ok(row) => row,
                Err(e) => {
                    debug!(line, error = %e, "Skipping unparseable filter line");
                    continue;
                }
            };
            if row.index == 0 || row.index > points.len() {
                debug!(index = row.index, "Filter index out of range, skipping");
                continue;
            }
            if seen.insert(row.index) {
                outcome.candidates.push(points[row.index - 1].clone());
            }
        }

        info!(
            input = points.len(),
            kept = outcome.candidates.len(),
            "Filtered pain points"
        );
        outcome
    }
}

fn format_points(points: &[Arc<PainPoint>]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. [{}] {}", i + 1, p.source, p.problem))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pain_point, FailingCompletion, MockCompletion};
    use nichesignal_common::SourceKind;

    fn points(n: usize) -> Vec<Arc<PainPoint>> {
        (0..n)
            .map(|i| pain_point(SourceKind::Reddit, &format!("problem number {i}"), i as i64))
            .collect()
    }

    #[tokio::test]
    async fn maps_indices_back_to_originals() {
        let input = points(5);
        let llm = Arc::new(MockCompletion::returning(
            "2 | problem number 1\n4 | problem number 3",
        ));
        let filter = CandidateFilter::new(llm);

        let outcome = filter.filter(&input).await;
        assert_eq!(outcome.candidates.len(), 2);
        assert!(Arc::ptr_eq(&outcome.candidates[0], &input[1]));
        assert!(Arc::ptr_eq(&outcome.candidates[1], &input[3]));
    }

    #[tokio::test]
    async fn bad_lines_and_out_of_range_indices_are_skipped() {
        let input = points(3);
        let llm = Arc::new(MockCompletion::returning(
            "0 | too low\n99 | too high\nnot a row\n2 | problem number 1\n2 | repeated index",
        ));
        let filter = CandidateFilter::new(llm);

        let outcome = filter.filter(&input).await;
        assert_eq!(outcome.candidates.len(), 1);
        assert!(Arc::ptr_eq(&outcome.candidates[0], &input[1]));
    }

    #[tokio::test]
    async fn call_failure_degrades_to_truncation() {
        let input = points(60);
        let filter = CandidateFilter::new(Arc::new(FailingCompletion)).with_max_candidates(45);

        let outcome = filter.filter(&input).await;
        assert_eq!(outcome.candidates.len(), 45);
        assert!(outcome.error.is_some());
        for (candidate, original) in outcome.candidates.iter().zip(&input) {
            assert!(Arc::ptr_eq(candidate, original));
        }
    }

    #[tokio::test]
    async fn respects_the_cap_on_parsed_lines() {
        let input = points(10);
        let response: String = (1..=10).map(|i| format!("{i} | p\n")).collect();
        let filter =
            CandidateFilter::new(Arc::new(MockCompletion::returning(&response))).with_max_candidates(4);

        let outcome = filter.filter(&input).await;
        assert_eq!(outcome.candidates.len(), 4);
    }

    #[tokio::test]
    async fn empty_input_is_a_valid_empty_outcome() {
        let filter = CandidateFilter::new(Arc::new(FailingCompletion));
        let outcome = filter.filter(&[]).await;
        assert!(outcome.candidates.is_empty());
        assert!(outcome.error.is_none());
    }
}
