use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use nichesignal_common::{SourceKind, SourceRecord};

use crate::error::{Result, SourceError};

const APIFY_BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for apidojo/tweet-scraper.
const TWEET_SCRAPER: &str = "61RPP7dywgiy0JPD0";

#[derive(Debug, Clone, Serialize)]
struct TweetSearchInput {
    #[serde(rename = "searchTerms")]
    search_terms: Vec<String>,
    #[serde(rename = "maxItems")]
    max_items: u32,
    sort: String,
}

/// A tweet from the Apify dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "likeCount")]
    pub like_count: i64,
    #[serde(default, rename = "retweetCount")]
    pub retweet_count: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    id: String,
    status: String,
    default_dataset_id: String,
}

/// Searches X/Twitter through an Apify actor: start a run, long-poll until
/// it settles, then pull the dataset.
pub struct XScraperClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    calls: AtomicU64,
}

impl XScraperClient {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            base_url: APIFY_BASE_URL.to_string(),
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

    async fn start_search_run(&self, terms: &[String], max_items: u32) -> Result<RunData> {
        let input = TweetSearchInput {
            search_terms: terms.to_vec(),
            max_items,
            sort: "Top".to_string(),
        };

        let url = format!("{}/acts/{}/runs", self.base_url, TWEET_SCRAPER);
        self.calls.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&input)
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

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient
    /// long-polling.
    async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", self.base_url, run_id);
            self.calls.fetch_add(1, Ordering::Relaxed);
            let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SourceError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(SourceError::RunFailed(api_resp.data.status));
                }
                _ => {
                    debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    async fn get_dataset_items(&self, dataset_id: &str) -> Result<Vec<Tweet>> {
        let url = format!(
            "{}/datasets/{}/items?format=json",
            self.base_url, dataset_id
        );
        self.calls.fetch_add(1, Ordering::Relaxed);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;

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

    /// Search tweets end-to-end: start run, poll, fetch results.
    pub async fn search_tweets(&self, terms: &[String], max_items: u32) -> Result<Vec<Tweet>> {
        info!(terms = terms.len(), max_items, "Starting X search scrape");

        let run = self.start_search_run(terms, max_items).await?;
        info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        let tweets = self.get_dataset_items(&completed.default_dataset_id).await?;
        info!(count = tweets.len(), "Fetched tweets");

        Ok(tweets)
    }

    /// Search and normalize into source records. `context` records the
    /// query set the tweets were pulled for.
    pub async fn collect_search(
        &self,
        terms: &[String],
        max_items: u32,
    ) -> Result<Vec<SourceRecord>> {
        let context = terms.join(", ");
        let tweets = self.search_tweets(terms, max_items).await?;
        Ok(tweets
            .into_iter()
            .filter(|t| !t.text.is_empty())
            .map(|t| SourceRecord {
                source: SourceKind::X,
                source_ref: t.id,
                text: t.text,
                engagement: t.like_count + t.retweet_count,
                context: Some(context.clone()),
            })
            .collect())
    }
}
