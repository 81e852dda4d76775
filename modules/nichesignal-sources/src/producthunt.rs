use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tracing::info;

use nichesignal_common::{SourceKind, SourceRecord};

use crate::error::{Result, SourceError};

const PRODUCTHUNT_API_URL: &str = "https://api.producthunt.com/v2/api/graphql";

const POSTS_QUERY: &str = r#"
query RecentPosts($first: Int!) {
  posts(order: VOTES, first: $first) {
    edges {
      node {
        id
        name
        tagline
        description
        votesCount
      }
    }
  }
}
"#;

/// A product launch listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductPost {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "votesCount", default)]
    pub votes_count: i64,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<PostsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: PostConnection,
}

#[derive(Debug, Deserialize)]
struct PostConnection {
    edges: Vec<PostEdge>,
}

#[derive(Debug, Deserialize)]
struct PostEdge {
    node: ProductPost,
}

/// Product Hunt GraphQL API client.
pub struct ProductHuntClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    calls: AtomicU64,
}

impl ProductHuntClient {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            base_url: PRODUCTHUNT_API_URL.to_string(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn calls_made(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Most-voted recent launches.
    pub async fn recent_posts(&self, limit: u32) -> Result<Vec<ProductPost>> {
        let body = serde_json::json!({
            "query": POSTS_QUERY,
            "variables": {"first": limit},
        });

        self.calls.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&body)
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

        let gql: GraphQlResponse = resp.json().await?;
        if let Some(err) = gql.errors.first() {
            return Err(SourceError::Api {
                status: 200,
                message: err.message.clone(),
            });
        }

        let posts: Vec<ProductPost> = gql
            .data
            .map(|d| d.posts.edges.into_iter().map(|e| e.node).collect())
            .unwrap_or_default();
        info!(count = posts.len(), "Fetched product launches");
        Ok(posts)
    }

    /// Fetch launches and normalize into source records. Text is name,
    /// tagline and description combined — launch copy often states the
    /// problem the product solves.
    pub async fn collect_recent(&self, limit: u32) -> Result<Vec<SourceRecord>> {
        let posts = self.recent_posts(limit).await?;
        Ok(posts
            .into_iter()
            .map(|p| {
                let mut text = format!("{}: {}", p.name, p.tagline);
                if let Some(desc) = &p.description {
                    if !desc.is_empty() {
                        text.push('\n');
                        text.push_str(desc);
                    }
                }
                SourceRecord {
                    source: SourceKind::ProductHunt,
                    source_ref: p.id,
                    text,
                    engagement: p.votes_count,
                    context: None,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_graphql_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"posts": {"edges": [
                    {"node": {"id": "ph1", "name": "InboxZeroer",
                              "tagline": "Stop drowning in newsletters",
                              "description": "Auto-triage for your inbox",
                              "votesCount": 180}}
                ]}}
            })))
            .mount(&server)
            .await;

        let client = ProductHuntClient::new("tok".into()).with_base_url(&server.uri());
        let records = client.collect_recent(20).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].engagement, 180);
        assert!(records[0].text.starts_with("InboxZeroer: Stop drowning"));
    }

    #[tokio::test]
    async fn graphql_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": null,
                "errors": [{"message": "rate limited"}]
            })))
            .mount(&server)
            .await;

        let client = ProductHuntClient::new("tok".into()).with_base_url(&server.uri());
        let err = client.recent_posts(10).await.unwrap_err();
        assert!(matches!(err, SourceError::Api { .. }));
    }
}
