//! Pure derivations from raw trend data. No I/O — everything here is
//! deterministic and unit-tested directly.

use nichesignal_common::AudienceTag;

/// Window width for interest and momentum math: one weekly data point per
/// day on the default range.
const WINDOW: usize = 7;

/// Substrings that signal a developer/technical audience.
const TECHNICAL_TERMS: &[&str] = &[
    "api",
    "sdk",
    "cli",
    "developer",
    "open source",
    "github",
    "code",
    "programming",
    "self-hosted",
    "automation",
    "integration",
    "database",
    "plugin",
];

/// Substrings that signal a business/operator audience.
const BUSINESS_TERMS: &[&str] = &[
    "pricing",
    "revenue",
    "saas",
    "crm",
    "invoice",
    "marketing",
    "sales",
    "startup",
    "clients",
    "customers",
    "roi",
    "b2b",
    "agency",
];

/// Integer average of the last seven points (or all points if fewer).
pub fn interest_score(series: &[i64]) -> u8 {
    if series.is_empty() {
        return 0;
    }
    let tail = &series[series.len().saturating_sub(WINDOW)..];
    let avg = tail.iter().sum::<i64>() / tail.len() as i64;
    avg.clamp(0, 100) as u8
}

/// Percentage change between the most recent seven-point window and the
/// preceding one. Needs at least fourteen points; otherwise 0 (stable).
pub fn momentum(series: &[i64]) -> f64 {
    if series.len() < 2 * WINDOW {
        return 0.0;
    }
    let recent: f64 =
        series[series.len() - WINDOW..].iter().sum::<i64>() as f64 / WINDOW as f64;
    let prior: f64 = series[series.len() - 2 * WINDOW..series.len() - WINDOW]
        .iter()
        .sum::<i64>() as f64
        / WINDOW as f64;
    if prior == 0.0 {
        return 0.0;
    }
    (recent - prior) / prior * 100.0
}

/// Up to five related terms, rising first, then backfill from top,
/// deduplicated.
pub fn pick_related(rising: &[String], top: &[String], cap: usize) -> Vec<String> {
    let mut picked: Vec<String> = Vec::with_capacity(cap);
    for term in rising.iter().chain(top.iter()) {
        if picked.len() >= cap {
            break;
        }
        if !picked.iter().any(|p| p.eq_ignore_ascii_case(term)) {
            picked.push(term.clone());
        }
    }
    picked
}

/// Classify the audience from the keyword plus related terms.
///
/// Both lists may match. No match at all defaults to both tags — an
/// ambiguous keyword is broadly applicable, not unclassifiable.
pub fn classify_audience(keyword: &str, related: &[String]) -> Vec<AudienceTag> {
    let blob = format!("{} {}", keyword, related.join(" ")).to_lowercase();

    let mut tags = Vec::new();
    if TECHNICAL_TERMS.iter().any(|t| blob.contains(t)) {
        tags.push(AudienceTag::Technical);
    }
    if BUSINESS_TERMS.iter().any(|t| blob.contains(t)) {
        tags.push(AudienceTag::Business);
    }
    if tags.is_empty() {
        tags = vec![AudienceTag::Technical, AudienceTag::Business];
    }
    tags
}

/// Composite trend score: interest 35%, momentum 30% (rescaled from
/// [-50, +50] to [0, 100], clipped), related-query count 20% (20 points per
/// query, capped), audience fit 15%.
pub fn trend_score(
    interest: u8,
    momentum: f64,
    related_count: usize,
    audience_tags: &[AudienceTag],
) -> u8 {
    let momentum_component = (momentum + 50.0).clamp(0.0, 100.0);
    let related_component = (related_count as f64 * 20.0).min(100.0);
    let audience_component = if audience_tags.is_empty() { 50.0 } else { 100.0 };

    (0.35 * interest as f64
        + 0.30 * momentum_component
        + 0.20 * related_component
        + 0.15 * audience_component)
        .round()
        .clamp(0.0, 100.0) as u8
}
