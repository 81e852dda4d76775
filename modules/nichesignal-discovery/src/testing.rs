//! Test mocks for the pipeline seams.
//!
//! One mock per trait boundary:
//! - MockSource (RecordSource) — canned records or scripted failure
//! - MockCompletion / FailingCompletion (CompletionAgent) — scripted text
//! - FixedEmbedder / FailingEmbedder (TextEmbedder) — deterministic vectors
//! - MockValidator (DemandValidator) — canned interest per keyword
//!
//! Plus helpers for constructing records and pain points.

use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use ai_client::traits::CompletionAgent;
use nichesignal_common::{
    PainPoint, SourceKind, SourceRecord, TextEmbedder, TrendValidation, UsageCounters,
};

use crate::sources::CollectPlan;
use crate::traits::{DemandValidator, RecordSource};

/// Standard embedding dimension for test vectors.
pub const TEST_EMBEDDING_DIM: usize = 64;

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn record(source: SourceKind, text: &str, engagement: i64) -> SourceRecord {
    SourceRecord {
        source,
        source_ref: format!("{}-{}", source.label(), engagement),
        text: text.to_string(),
        engagement,
        context: None,
    }
}

pub fn pain_point(source: SourceKind, problem: &str, engagement: i64) -> Arc<PainPoint> {
    Arc::new(PainPoint {
        id: Uuid::new_v4(),
        raw_text: problem.to_string(),
        problem: problem.to_string(),
        source,
        source_ref: format!("{}-{}", source.label(), engagement),
        engagement,
        extracted_at: Utc::now(),
        context: None,
    })
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Canned records for one source kind; `failing()` scripts a dead branch.
pub struct MockSource {
    kind: SourceKind,
    records: Vec<SourceRecord>,
    fail: bool,
    calls: AtomicU64,
}

impl MockSource {
    pub fn new(kind: SourceKind, records: Vec<SourceRecord>) -> Self {
        Self {
            kind,
            records,
            fail: false,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing(kind: SourceKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            fail: true,
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl RecordSource for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn collect(&self, _plan: &CollectPlan) -> Result<Vec<SourceRecord>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(anyhow!("scripted {} outage", self.kind));
        }
        Ok(self.records.clone())
    }

    fn calls_made(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Completion mocks
// ---------------------------------------------------------------------------

/// Scripted completions, popped in order. A fixed single response can be
/// built with `returning`; an exhausted script errors.
pub struct MockCompletion {
    responses: Mutex<VecDeque<String>>,
    repeat_last: bool,
}

impl MockCompletion {
    pub fn returning(response: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([response.to_string()])),
            repeat_last: true,
        }
    }

    pub fn scripted(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            repeat_last: false,
        }
    }
}

#[async_trait]
impl CompletionAgent for MockCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        let mut responses = self.responses.lock().unwrap();
        if self.repeat_last && responses.len() == 1 {
            return Ok(responses[0].clone());
        }
        responses
            .pop_front()
            .ok_or_else(|| anyhow!("MockCompletion: script exhausted"))
    }
}

/// Always fails — for degradation paths.
pub struct FailingCompletion;

#[async_trait]
impl CompletionAgent for FailingCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Err(anyhow!("scripted model outage"))
    }
}

// ---------------------------------------------------------------------------
// Embedder mocks
// ---------------------------------------------------------------------------

/// Deterministic hash-seeded vectors: identical texts get identical vectors
/// (cosine 1.0), distinct texts get effectively uncorrelated ones.
pub struct FixedEmbedder {
    dim: usize,
}

impl FixedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();

        (0..self.dim)
            .map(|_| {
                // Small xorshift keeps the vector deterministic per text.
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                (seed % 1000) as f32 / 1000.0 - 0.5
            })
            .collect()
    }
}

#[async_trait]
impl TextEmbedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Always fails — for the singleton-cluster fallback path.
pub struct FailingEmbedder;

#[async_trait]
impl TextEmbedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(anyhow!("scripted embedding outage"))
    }

    async fn embed_batch(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("scripted embedding outage"))
    }
}

// ---------------------------------------------------------------------------
// MockValidator
// ---------------------------------------------------------------------------

/// Canned interest scores per keyword; unknown keywords validate to zero
/// signal, mirroring the real validator's floor.
#[derive(Default)]
pub struct MockValidator {
    interest: HashMap<String, u8>,
}

impl MockValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interest(mut self, keyword: &str, interest: u8) -> Self {
        self.interest.insert(keyword.to_string(), interest);
        self
    }
}

#[async_trait]
impl DemandValidator for MockValidator {
    async fn validate_batch(&self, keywords: &[String]) -> Vec<TrendValidation> {
        keywords
            .iter()
            .map(|kw| match self.interest.get(kw) {
                Some(interest) => TrendValidation {
                    interest_score: *interest,
                    trend_score: *interest,
                    ..TrendValidation::zero_signal(kw.clone())
                },
                None => TrendValidation::zero_signal(kw.clone()),
            })
            .collect()
    }

    fn usage(&self) -> UsageCounters {
        let mut usage = UsageCounters::default();
        usage.record("serpapi_calls", self.interest.len() as u64);
        usage
    }
}
