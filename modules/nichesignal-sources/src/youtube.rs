use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tracing::info;

use nichesignal_common::{SourceKind, SourceRecord};

use crate::error::{Result, SourceError};

const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// A video matched by search.
#[derive(Debug, Clone)]
pub struct VideoHit {
    pub video_id: String,
    pub title: String,
}

/// A top-level comment on a video.
#[derive(Debug, Clone)]
pub struct VideoComment {
    pub comment_id: String,
    pub text: String,
    pub like_count: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    id: String,
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentSnippet {
    #[serde(rename = "textOriginal")]
    text_original: String,
    #[serde(rename = "likeCount", default)]
    like_count: i64,
}

/// YouTube Data API v3 client: video search plus comment threads.
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    calls: AtomicU64,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: YOUTUBE_BASE_URL.to_string(),
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

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .http
            .get(url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
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
        Ok(resp.json().await?)
    }

    /// Search videos by query, ordered by view count.
    pub async fn search_videos(&self, query: &str, limit: u32) -> Result<Vec<VideoHit>> {
        let url = format!("{}/search", self.base_url);
        let limit = limit.to_string();
        let response: SearchResponse = self
            .get_json(
                &url,
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("order", "viewCount"),
                    ("q", query),
                    ("maxResults", &limit),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                item.id.video_id.map(|video_id| VideoHit {
                    video_id,
                    title: item.snippet.title,
                })
            })
            .collect())
    }

    /// Top-level comments for one video, most relevant first.
    pub async fn video_comments(&self, video_id: &str, limit: u32) -> Result<Vec<VideoComment>> {
        let url = format!("{}/commentThreads", self.base_url);
        let limit = limit.to_string();
        let response: CommentThreadsResponse = self
            .get_json(
                &url,
                &[
                    ("part", "snippet"),
                    ("order", "relevance"),
                    ("videoId", video_id),
                    ("maxResults", &limit),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .map(|thread| VideoComment {
                comment_id: thread.id,
                text: thread.snippet.top_level_comment.snippet.text_original,
                like_count: thread.snippet.top_level_comment.snippet.like_count,
            })
            .collect())
    }

    /// Search videos for a query and pull comments for each hit, normalized
    /// into source records. Per-video comment failures are skipped, not fatal.
    pub async fn collect_query(
        &self,
        query: &str,
        video_limit: u32,
        comments_per_video: u32,
    ) -> Result<Vec<SourceRecord>> {
        let hits = self.search_videos(query, video_limit).await?;
        info!(query, videos = hits.len(), "Searching video comments");

        let mut records = Vec::new();
        for hit in hits {
            let comments = match self.video_comments(&hit.video_id, comments_per_video).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(video_id = hit.video_id, error = %e, "Comment fetch failed, skipping video");
                    continue;
                }
            };
            for comment in comments {
                if comment.text.is_empty() {
                    continue;
                }
                records.push(SourceRecord {
                    source: SourceKind::YouTube,
                    source_ref: comment.comment_id,
                    text: comment.text,
                    engagement: comment.like_count,
                    context: Some(hit.title.clone()),
                });
            }
        }
        Ok(records)
    }
}
