//! Pain-point mining: one model call per source batch.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::traits::CompletionAgent;
use ai_client::util::truncate_to_char_boundary;
use nichesignal_common::{PainPoint, SourceKind, SourceRecord, UsageCounters};

use crate::parse::parse_loose_lines;

/// Cap on records formatted into one prompt, to bound prompt size.
pub const MAX_RECORDS_PER_CALL: usize = 120;

/// Per-record text budget inside the prompt.
const RECORD_TEXT_BYTES: usize = 600;

/// Responses shorter than this are treated as "model found nothing" rather
/// than a format miss worth re-parsing loosely.
const TRIVIAL_RESPONSE_LEN: usize = 50;

/// Minimum stripped-line length for the loose fallback parser.
const LOOSE_LINE_MIN_LEN: usize = 20;

const EXTRACTION_FORMAT: &str = r#"For every distinct complaint or unmet need you find, output one block:

ITEM: <number of the record it came from>
QUOTE: <the user's own words, lightly trimmed>
PROBLEM: <one-sentence normalized problem statement>

Separate blocks with a line containing only `---`. Output at most 25 blocks.
Skip praise, memes, and support questions about a specific product's UI."#;

/// What one extract branch hands back to the pipeline. Never an error —
/// failures degrade to an empty list plus a note.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub pain_points: Vec<Arc<PainPoint>>,
    pub usage: UsageCounters,
    pub error: Option<String>,
}

pub struct PainPointExtractor {
    llm: Arc<dyn CompletionAgent>,
}

impl PainPointExtractor {
    pub fn new(llm: Arc<dyn CompletionAgent>) -> Self {
        Self { llm }
    }

    /// Mine pain points from one source's records.
    pub async fn extract(&self, source: SourceKind, records: &[SourceRecord]) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();
        if records.is_empty() {
            return outcome;
        }

        let batch = &records[..records.len().min(MAX_RECORDS_PER_CALL)];
        let user_prompt = format_records(batch);
        outcome.usage.record("llm_calls", 1);

        let response = match self.llm.complete(&system_prompt(source), &user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(source = %source, error = %e, "Extraction call failed");
                outcome.error = Some(format!("{source} extraction failed: {e}"));
                return outcome;
            }
        };

        outcome.pain_points = parse_response(&response, source, batch);
        info!(
            source = %source,
            records = batch.len(),
            pain_points = outcome.pain_points.len(),
            "Extracted pain points"
        );
        outcome
    }
}

fn system_prompt(source: SourceKind) -> String {
    let conventions = match source {
        SourceKind::Reddit => {
            "The records are forum posts. Complaints are usually explicit and \
             detailed; prefer the post body over the title when quoting."
        }
        SourceKind::X => {
            "The records are short social posts. Complaints are compressed and \
             sarcastic; read through the snark to the underlying need."
        }
        SourceKind::YouTube => {
            "The records are video comments. Complaints often react to the \
             video's topic — extract the commenter's own problem, not the video's."
        }
        SourceKind::ProductHunt => {
            "The records are product launch listings. The problem is implied by \
             what the product claims to fix — extract that claimed pain."
        }
    };

    format!(
        "You mine user frustrations and unmet needs from {} content.\n{}\n\n{}",
        source, conventions, EXTRACTION_FORMAT
    )
}

fn format_records(records: &[SourceRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. [engagement {}] {}",
                i + 1,
                r.engagement,
                truncate_to_char_boundary(&r.text, RECORD_TEXT_BYTES)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn parse_response(response: &str, source: SourceKind, records: &[SourceRecord]) -> Vec<Arc<PainPoint>> {
    let parsed = parse_blocks(response, source, records);
    if !parsed.is_empty() {
        return parsed;
    }

    if response.trim().len() <= TRIVIAL_RESPONSE_LEN {
        return Vec::new();
    }

    // The model ignored the block format — salvage numbered/bulleted lines.
    parse_loose_lines(response, LOOSE_LINE_MIN_LEN)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            Arc::new(PainPoint {
                id: Uuid::new_v4(),
                raw_text: line.clone(),
                problem: line,
                source,
                source_ref: format!("{}-mined-{}", source.label(), i + 1),
                engagement: 0,
                extracted_at: Utc::now(),
                context: None,
            })
        })
        .collect()
}

/// Primary format: `ITEM:`/`QUOTE:`/`PROBLEM:` blocks separated by `---`.
/// A block with no problem is dropped; a missing quote falls back to the
/// problem text; a bad item number just loses record attribution.
fn parse_blocks(response: &str, source: SourceKind, records: &[SourceRecord]) -> Vec<Arc<PainPoint>> {
    let now = Utc::now();
    let mut points = Vec::new();

    for (block_no, block) in response.split("\n---").enumerate() {
        let mut item: Option<usize> = None;
        let mut quote: Option<String> = None;
        let mut problem: Option<String> = None;

        for line in block.lines() {
            let line = line.trim().trim_start_matches('-').trim_start();
            if let Some(rest) = line.strip_prefix("ITEM:") {
                item = rest.trim().parse().ok();
            } else if let Some(rest) = line.strip_prefix("QUOTE:") {
                quote = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("PROBLEM:") {
                problem = Some(rest.trim().to_string());
            }
        }

        let Some(problem) = problem.filter(|p| !p.is_empty()) else {
            continue;
        };

        let record = item
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| records.get(i));

        points.push(Arc::new(PainPoint {
            id: Uuid::new_v4(),
            raw_text: quote.filter(|q| !q.is_empty()).unwrap_or_else(|| problem.clone()),
            problem,
            source,
            source_ref: record
                .map(|r| r.source_ref.clone())
                .unwrap_or_else(|| format!("{}-mined-{}", source.label(), block_no + 1)),
            engagement: record.map(|r| r.engagement).unwrap_or(0),
            extracted_at: now,
            context: record.and_then(|r| r.context.clone()),
        }));
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, FailingCompletion, MockCompletion};

    fn batch() -> Vec<SourceRecord> {
        vec![
            record(SourceKind::Reddit, "I spend every Sunday night copying receipts into a spreadsheet", 42),
            record(SourceKind::Reddit, "Why is there no way to split rent utilities with roommates automatically", 17),
        ]
    }

    #[tokio::test]
    async fn parses_block_format_with_attribution() {
        let llm = Arc::new(MockCompletion::returning(
            "ITEM: 2\nQUOTE: no way to split rent utilities with roommates\nPROBLEM: Splitting shared household bills is manual\n---\nITEM: 1\nQUOTE: copying receipts into a spreadsheet\nPROBLEM: Expense tracking requires manual data entry",
        ));
        let extractor = PainPointExtractor::new(llm);

        let outcome = extractor.extract(SourceKind::Reddit, &batch()).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.pain_points.len(), 2);
        assert_eq!(outcome.pain_points[0].engagement, 17);
        assert_eq!(outcome.pain_points[1].engagement, 42);
        assert_eq!(outcome.usage.get("llm_calls"), 1);
    }

    #[tokio::test]
    async fn block_without_problem_is_dropped() {
        let llm = Arc::new(MockCompletion::returning(
            "ITEM: 1\nQUOTE: some quote with no problem line\n---\nITEM: 2\nPROBLEM: A real problem statement",
        ));
        let extractor = PainPointExtractor::new(llm);

        let outcome = extractor.extract(SourceKind::Reddit, &batch()).await;
        assert_eq!(outcome.pain_points.len(), 1);
        assert_eq!(outcome.pain_points[0].problem, "A real problem statement");
        // Missing quote falls back to the problem text.
        assert_eq!(outcome.pain_points[0].raw_text, "A real problem statement");
    }

    #[tokio::test]
    async fn numbered_list_fallback_kicks_in() {
        let llm = Arc::new(MockCompletion::returning(
            "Here are the pain points I found:\n1. tracking freelance invoices across clients is chaos\n2. short\n3. scheduling posts for multiple accounts needs three tools",
        ));
        let extractor = PainPointExtractor::new(llm);

        let outcome = extractor.extract(SourceKind::X, &batch()).await;
        assert_eq!(outcome.pain_points.len(), 2);
        assert_eq!(outcome.pain_points[0].engagement, 0);
        assert!(outcome.pain_points[0]
            .problem
            .starts_with("tracking freelance invoices"));
    }

    #[tokio::test]
    async fn short_garbage_response_yields_nothing() {
        let llm = Arc::new(MockCompletion::returning("None found."));
        let extractor = PainPointExtractor::new(llm);

        let outcome = extractor.extract(SourceKind::Reddit, &batch()).await;
        assert!(outcome.pain_points.is_empty());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_empty_with_note() {
        let extractor = PainPointExtractor::new(Arc::new(FailingCompletion));

        let outcome = extractor.extract(SourceKind::YouTube, &batch()).await;
        assert!(outcome.pain_points.is_empty());
        assert!(outcome.error.as_deref().unwrap().contains("youtube"));
    }

    #[tokio::test]
    async fn empty_input_skips_the_call() {
        let llm = Arc::new(MockCompletion::returning("unused"));
        let extractor = PainPointExtractor::new(llm);

        let outcome = extractor.extract(SourceKind::Reddit, &[]).await;
        assert!(outcome.pain_points.is_empty());
        assert_eq!(outcome.usage.get("llm_calls"), 0);
    }
}
