//! Collect plans and the adapters binding concrete clients to the
//! `RecordSource` seam.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use nichesignal_common::{SourceKind, SourceRecord};
use nichesignal_sources::{ProductHuntClient, RedditClient, XScraperClient, YouTubeClient};

use crate::traits::RecordSource;

/// Pause between consecutive queries against the same public API.
const INTER_QUERY_DELAY: Duration = Duration::from_millis(250);

/// What each source should go looking for this cycle.
#[derive(Debug, Clone)]
pub struct CollectPlan {
    pub subreddits: Vec<String>,
    pub x_search_terms: Vec<String>,
    pub youtube_queries: Vec<String>,
    pub records_per_query: u32,
    pub comments_per_video: u32,
    pub producthunt_limit: u32,
}

impl CollectPlan {
    /// The standing production sweep.
    pub fn standard() -> Self {
        Self {
            subreddits: to_strings(&[
                "smallbusiness",
                "productivity",
                "freelance",
                "selfhosted",
                "Entrepreneur",
                "mildlyinfuriating",
            ]),
            x_search_terms: to_strings(&[
                "\"wish there was an app\"",
                "\"why is there no app\"",
                "\"someone should build\"",
            ]),
            youtube_queries: to_strings(&[
                "best productivity apps",
                "small business software review",
                "app I wish existed",
            ]),
            records_per_query: 25,
            comments_per_video: 20,
            producthunt_limit: 40,
        }
    }

    /// Same shape, a fraction of the volume. Output types are identical —
    /// only cardinality shrinks.
    pub fn scaled_down() -> Self {
        Self {
            subreddits: to_strings(&["smallbusiness"]),
            x_search_terms: to_strings(&["\"wish there was an app\""]),
            youtube_queries: to_strings(&["best productivity apps"]),
            records_per_query: 5,
            comments_per_video: 5,
            producthunt_limit: 10,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

pub struct RedditSource {
    client: RedditClient,
}

impl RedditSource {
    pub fn new(client: RedditClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource for RedditSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Reddit
    }

    async fn collect(&self, plan: &CollectPlan) -> anyhow::Result<Vec<SourceRecord>> {
        let mut records = Vec::new();
        let mut failures = 0;
        for (i, subreddit) in plan.subreddits.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_QUERY_DELAY).await;
            }
            match self
                .client
                .collect_subreddit(subreddit, plan.records_per_query)
                .await
            {
                Ok(batch) => records.extend(batch),
                Err(e) => {
                    warn!(subreddit, error = %e, "Subreddit fetch failed, skipping");
                    failures += 1;
                }
            }
        }
        if records.is_empty() && failures > 0 {
            anyhow::bail!("all {failures} subreddit fetches failed");
        }
        Ok(records)
    }

    fn calls_made(&self) -> u64 {
        self.client.calls_made()
    }
}

pub struct XSource {
    client: XScraperClient,
}

impl XSource {
    pub fn new(client: XScraperClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource for XSource {
    fn kind(&self) -> SourceKind {
        SourceKind::X
    }

    async fn collect(&self, plan: &CollectPlan) -> anyhow::Result<Vec<SourceRecord>> {
        let max_items = plan.records_per_query * plan.x_search_terms.len() as u32;
        Ok(self
            .client
            .collect_search(&plan.x_search_terms, max_items)
            .await?)
    }

    fn calls_made(&self) -> u64 {
        self.client.calls_made()
    }
}

pub struct YouTubeSource {
    client: YouTubeClient,
}

impl YouTubeSource {
    pub fn new(client: YouTubeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource for YouTubeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    async fn collect(&self, plan: &CollectPlan) -> anyhow::Result<Vec<SourceRecord>> {
        let mut records = Vec::new();
        let mut failures = 0;
        for (i, query) in plan.youtube_queries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_QUERY_DELAY).await;
            }
            match self
                .client
                .collect_query(query, plan.records_per_query, plan.comments_per_video)
                .await
            {
                Ok(batch) => records.extend(batch),
                Err(e) => {
                    warn!(query, error = %e, "Video query failed, skipping");
                    failures += 1;
                }
            }
        }
        if records.is_empty() && failures > 0 {
            anyhow::bail!("all {failures} video queries failed");
        }
        Ok(records)
    }

    fn calls_made(&self) -> u64 {
        self.client.calls_made()
    }
}

pub struct ProductHuntSource {
    client: ProductHuntClient,
}

impl ProductHuntSource {
    pub fn new(client: ProductHuntClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource for ProductHuntSource {
    fn kind(&self) -> SourceKind {
        SourceKind::ProductHunt
    }

    async fn collect(&self, plan: &CollectPlan) -> anyhow::Result<Vec<SourceRecord>> {
        Ok(self.client.collect_recent(plan.producthunt_limit).await?)
    }

    fn calls_made(&self) -> u64 {
        self.client.calls_made()
    }
}
