//! Greedy single-pass clustering of pain points by embedding similarity.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use nichesignal_common::{PainPoint, PainPointCluster, TextEmbedder};

/// Similarity floor for "same underlying problem". High on purpose — a
/// false merge buries a distinct problem under another's representative.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.82;

pub struct ClusterEngine {
    embedder: Arc<dyn TextEmbedder>,
    threshold: f32,
}

impl ClusterEngine {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Group pain points into clusters, one batched embedding call.
    ///
    /// O(n·k) over k live centroids. Points are assigned in input order to
    /// the best-matching centroid at or above the threshold (ties keep the
    /// earliest cluster); otherwise they seed a new cluster. Centroids are
    /// incremental running means. If embedding fails, every point becomes
    /// its own singleton cluster so downstream stages always get a valid
    /// list.
    pub async fn cluster(&self, points: &[Arc<PainPoint>]) -> Vec<PainPointCluster> {
        if points.is_empty() {
            return Vec::new();
        }

        let texts: Vec<String> = points.iter().map(|p| p.problem.clone()).collect();
        let embeddings = match self.embedder.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == points.len() => vectors,
            Ok(vectors) => {
                warn!(
                    expected = points.len(),
                    got = vectors.len(),
                    "Embedding batch count mismatch, degrading to singleton clusters"
                );
                return singleton_clusters(points);
            }
            Err(e) => {
                warn!(error = %e, "Embedding call failed, degrading to singleton clusters");
                return singleton_clusters(points);
            }
        };

        let mut centroids: Vec<Vec<f32>> = Vec::new();
        let mut memberships: Vec<Vec<usize>> = Vec::new();

        for (idx, vector) in embeddings.iter().enumerate() {
            let mut best: Option<(usize, f32)> = None;
            for (c, centroid) in centroids.iter().enumerate() {
                let similarity = cosine_similarity(vector, centroid);
                // Strict > keeps the first-encountered cluster on ties.
                if best.map_or(true, |(_, s)| similarity > s) {
                    best = Some((c, similarity));
                }
            }

            match best {
                Some((c, similarity)) if similarity >= self.threshold => {
                    memberships[c].push(idx);
                    let n = memberships[c].len() as f32;
                    for (dim, value) in centroids[c].iter_mut().zip(vector) {
                        *dim += (value - *dim) / n;
                    }
                }
                _ => {
                    centroids.push(vector.clone());
                    memberships.push(vec![idx]);
                }
            }
        }

        let mut clusters: Vec<PainPointCluster> = memberships
            .into_iter()
            .map(|member_ids| build_cluster(member_ids.into_iter().map(|i| points[i].clone())))
            .collect();

        clusters.sort_by(|a, b| b.total_engagement.cmp(&a.total_engagement));

        info!(
            points = points.len(),
            clusters = clusters.len(),
            "Clustered pain points"
        );
        clusters
    }
}

fn build_cluster(members: impl Iterator<Item = Arc<PainPoint>>) -> PainPointCluster {
    let members: Vec<Arc<PainPoint>> = members.collect();

    let mut engagement_by_source: HashMap<_, i64> = HashMap::new();
    for member in &members {
        *engagement_by_source.entry(member.source).or_default() += member.engagement;
    }
    let total_engagement = engagement_by_source.values().sum();

    // Representative is the highest-engagement member; first wins on ties.
    let mut best = &members[0];
    for member in &members[1..] {
        if member.engagement > best.engagement {
            best = member;
        }
    }
    let representative = best.problem.clone();

    PainPointCluster {
        representative,
        members,
        engagement_by_source,
        total_engagement,
    }
}

fn singleton_clusters(points: &[Arc<PainPoint>]) -> Vec<PainPointCluster> {
    points
        .iter()
        .map(|p| build_cluster(std::iter::once(p.clone())))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
