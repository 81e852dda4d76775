use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tracing::info;

use nichesignal_common::{SourceKind, SourceRecord};

use crate::error::{Result, SourceError};

const REDDIT_BASE_URL: &str = "https://www.reddit.com";
const USER_AGENT: &str = "nichesignal/0.1 (pain point research)";

/// A post pulled from a subreddit listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub num_comments: i64,
    pub subreddit: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

/// Client for Reddit's public JSON listings. No auth, but a descriptive
/// User-Agent is required or Reddit throttles aggressively.
pub struct RedditClient {
    http: reqwest::Client,
    base_url: String,
    calls: AtomicU64,
}

impl RedditClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: REDDIT_BASE_URL.to_string(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// HTTP calls made over this client's lifetime.
    pub fn calls_made(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Top posts of the trailing week for one subreddit.
    pub async fn top_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<RedditPost>> {
        let url = format!(
            "{}/r/{}/top.json?t=week&limit={}",
            self.base_url, subreddit, limit
        );

        self.calls.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let listing: Listing = resp.json().await?;
        let posts: Vec<RedditPost> = listing.data.children.into_iter().map(|c| c.data).collect();
        info!(subreddit, count = posts.len(), "Fetched subreddit top posts");
        Ok(posts)
    }

    /// Fetch one subreddit and normalize into source records.
    pub async fn collect_subreddit(&self, subreddit: &str, limit: u32) -> Result<Vec<SourceRecord>> {
        let posts = self.top_posts(subreddit, limit).await?;
        Ok(posts
            .into_iter()
            .map(|p| {
                let text = if p.selftext.is_empty() {
                    p.title.clone()
                } else {
                    format!("{}\n{}", p.title, p.selftext)
                };
                SourceRecord {
                    source: SourceKind::Reddit,
                    source_ref: p.id,
                    text,
                    engagement: p.ups,
                    context: Some(format!("r/{}", p.subreddit)),
                }
            })
            .collect())
    }
}

impl Default for RedditClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing_body() -> serde_json::Value {
        serde_json::json!({
            "data": {
                "children": [
                    {"data": {"id": "p1", "title": "I hate exporting invoices by hand",
                              "selftext": "every month, hours wasted", "ups": 42,
                              "num_comments": 7, "subreddit": "smallbusiness"}},
                    {"data": {"id": "p2", "title": "Link only post",
                              "ups": 3, "subreddit": "smallbusiness"}}
                ]
            }
        })
    }

    #[tokio::test]
    async fn parses_listing_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/smallbusiness/top.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_body()))
            .mount(&server)
            .await;

        let client = RedditClient::new().with_base_url(&server.uri());
        let records = client.collect_subreddit("smallbusiness", 25).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].engagement, 42);
        assert!(records[0].text.contains("hours wasted"));
        assert_eq!(records[1].text, "Link only post");
        assert_eq!(records[0].context.as_deref(), Some("r/smallbusiness"));
        assert_eq!(client.calls_made(), 1);
    }

    #[tokio::test]
    async fn surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = RedditClient::new().with_base_url(&server.uri());
        let err = client.top_posts("anything", 5).await.unwrap_err();
        match err {
            SourceError::Api { status, .. } => assert_eq!(status, 429),
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
