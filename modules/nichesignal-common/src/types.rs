use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a record or pain point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Reddit,
    X,
    YouTube,
    ProductHunt,
}

impl SourceKind {
    /// Declaration order — also the deterministic merge order for
    /// fan-out branches.
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Reddit,
        SourceKind::X,
        SourceKind::YouTube,
        SourceKind::ProductHunt,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Reddit => "reddit",
            SourceKind::X => "x",
            SourceKind::YouTube => "youtube",
            SourceKind::ProductHunt => "producthunt",
        }
    }

    /// Engagement value at which the normalized score saturates at 100.
    /// Scales differ per platform: 100 upvotes on a niche subreddit means
    /// more than 100 views on a video.
    pub fn engagement_saturation(&self) -> i64 {
        match self {
            SourceKind::Reddit => 100,
            SourceKind::X => 100,
            SourceKind::YouTube => 50,
            SourceKind::ProductHunt => 200,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalize raw engagement to [10, 100] on the source's own scale.
///
/// Zero or negative engagement gets the fixed floor of 10 — low-signal items
/// are dampened, not discarded.
pub fn normalize_engagement(source: SourceKind, engagement: i64) -> u8 {
    if engagement <= 0 {
        return 10;
    }
    let scaled = engagement as f64 / source.engagement_saturation() as f64 * 100.0;
    (scaled.round() as i64).clamp(10, 100) as u8
}

/// A normalized record from one content source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: SourceKind,
    /// Source-native identifier (post id, video id, tweet id, slug).
    pub source_ref: String,
    pub text: String,
    /// Upvotes / likes / views — source-scale-dependent.
    pub engagement: i64,
    /// Subreddit, channel, query, or topic the record was pulled for.
    pub context: Option<String>,
}

/// One mined complaint or wish. Immutable once created; downstream entities
/// hold `Arc` references, never copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PainPoint {
    pub id: Uuid,
    /// Quoted or closely paraphrased user text.
    pub raw_text: String,
    /// Normalized problem statement.
    pub problem: String,
    pub source: SourceKind,
    pub source_ref: String,
    pub engagement: i64,
    pub extracted_at: DateTime<Utc>,
    pub context: Option<String>,
}

/// A group of pain points describing the same underlying problem.
///
/// Built and mutated only inside the clustering pass; read-only afterward.
/// `representative` always equals the problem text of the
/// highest-engagement member.
#[derive(Debug, Clone)]
pub struct PainPointCluster {
    pub representative: String,
    pub members: Vec<Arc<PainPoint>>,
    pub engagement_by_source: HashMap<SourceKind, i64>,
    pub total_engagement: i64,
}

impl PainPointCluster {
    /// Number of distinct sources contributing members.
    pub fn source_count(&self) -> usize {
        self.engagement_by_source.len()
    }
}

/// A scored, ranked candidate app concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppOpportunity {
    pub problem: String,
    pub app_concept: String,
    pub search_keyword: String,
    pub demand_score: u8,
    pub virality_score: u8,
    pub buildability_score: u8,
    pub opportunity_score: u8,
    pub pain_points: Vec<Arc<PainPoint>>,
    pub audience_tags: Vec<AudienceTag>,
    pub similar_products: Vec<String>,
}

/// Composite opportunity score. Demand and virality carry real signal
/// (search interest, observed engagement); buildability is a model estimate,
/// so it gets the smallest weight.
pub fn compose_score(demand: u8, virality: u8, buildability: u8) -> u8 {
    (0.4 * demand as f64 + 0.4 * virality as f64 + 0.2 * buildability as f64).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Stable,
    Declining,
}

impl TrendDirection {
    /// Strict thresholds: exactly ±10% is still stable.
    pub fn from_momentum(momentum: f64) -> Self {
        if momentum > 10.0 {
            TrendDirection::Rising
        } else if momentum < -10.0 {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudienceTag {
    Technical,
    Business,
}

/// Which provider produced a validation's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendProvider {
    SerpApi,
    Widget,
    /// Both providers failed — all-zero signal.
    NoData,
}

/// Result of one demand query. Created fresh per validation; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendValidation {
    pub keyword: String,
    /// Recent average of the normalized interest series, [0, 100].
    pub interest_score: u8,
    /// Signed week-over-week percentage change.
    pub momentum: f64,
    pub direction: TrendDirection,
    /// At most five terms, rising preferred over top.
    pub related_queries: Vec<String>,
    pub audience_tags: Vec<AudienceTag>,
    pub trend_score: u8,
    pub provider: TrendProvider,
}

impl TrendValidation {
    /// The all-zero validation used when every provider fails.
    pub fn zero_signal(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            interest_score: 0,
            momentum: 0.0,
            direction: TrendDirection::Stable,
            related_queries: Vec::new(),
            audience_tags: Vec::new(),
            trend_score: 0,
            provider: TrendProvider::NoData,
        }
    }
}

/// Named run counters plus string labels.
///
/// Counters merge by summing, labels by overwrite — the two halves of the
/// usage-map reduce rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageCounters {
    pub counters: BTreeMap<String, u64>,
    pub labels: BTreeMap<String, String>,
}

impl UsageCounters {
    pub fn record(&mut self, name: &str, n: u64) {
        *self.counters.entry(name.to_string()).or_default() += n;
    }

    pub fn label(&mut self, name: &str, value: impl Into<String>) {
        self.labels.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Sum counters, overwrite labels.
    pub fn merge(&mut self, other: &UsageCounters) {
        for (name, n) in &other.counters {
            *self.counters.entry(name.clone()).or_default() += n;
        }
        for (name, value) in &other.labels {
            self.labels.insert(name.clone(), value.clone());
        }
    }
}
