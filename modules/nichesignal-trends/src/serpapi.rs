use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tracing::debug;

use crate::error::TrendError;

const SERPAPI_BASE_URL: &str = "https://serpapi.com";

/// Related search terms, split the way the provider reports them.
#[derive(Debug, Clone, Default)]
pub struct RelatedTerms {
    pub rising: Vec<String>,
    pub top: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    #[serde(default)]
    interest_over_time: Option<InterestOverTime>,
}

#[derive(Debug, Deserialize)]
struct InterestOverTime {
    #[serde(default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    #[serde(default)]
    values: Vec<TimelineValue>,
}

#[derive(Debug, Deserialize)]
struct TimelineValue {
    #[serde(default)]
    extracted_value: i64,
}

#[derive(Debug, Deserialize)]
struct RelatedResponse {
    #[serde(default)]
    related_queries: Option<RelatedQueries>,
}

#[derive(Debug, Deserialize)]
struct RelatedQueries {
    #[serde(default)]
    rising: Vec<RelatedEntry>,
    #[serde(default)]
    top: Vec<RelatedEntry>,
}

#[derive(Debug, Deserialize)]
struct RelatedEntry {
    query: String,
}

/// Google Trends data through SerpApi. The API key is passed per call — key
/// selection belongs to the quota ledger, not the client.
pub struct SerpTrendsClient {
    http: reqwest::Client,
    base_url: String,
    calls: AtomicU64,
}

impl SerpTrendsClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: SERPAPI_BASE_URL.to_string(),
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
        keyword: &str,
        data_type: &str,
        api_key: &str,
    ) -> Result<T, TrendError> {
        let url = format!("{}/search", self.base_url);

        debug!(keyword, data_type, "SerpApi trends request");
        self.calls.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("engine", "google_trends"),
                ("q", keyword),
                ("date", "today 3-m"),
                ("data_type", data_type),
                ("api_key", api_key),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(TrendError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TrendError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp.json().await?)
    }

    /// Normalized interest values over the trailing window, oldest first.
    pub async fn interest_over_time(
        &self,
        keyword: &str,
        api_key: &str,
    ) -> Result<Vec<i64>, TrendError> {
        let response: TimeseriesResponse =
            self.get_json(keyword, "TIMESERIES", api_key).await?;

        Ok(response
            .interest_over_time
            .map(|iot| {
                iot.timeline_data
                    .into_iter()
                    .filter_map(|p| p.values.into_iter().next().map(|v| v.extracted_value))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Rising and top related queries for a keyword.
    pub async fn related_queries(
        &self,
        keyword: &str,
        api_key: &str,
    ) -> Result<RelatedTerms, TrendError> {
        let response: RelatedResponse =
            self.get_json(keyword, "RELATED_QUERIES", api_key).await?;

        Ok(response
            .related_queries
            .map(|rq| RelatedTerms {
                rising: rq.rising.into_iter().map(|e| e.query).collect(),
                top: rq.top.into_iter().map(|e| e.query).collect(),
            })
            .unwrap_or_default())
    }
}

impl Default for SerpTrendsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_timeseries_points() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("data_type", "TIMESERIES"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "interest_over_time": {"timeline_data": [
                    {"values": [{"extracted_value": 40}]},
                    {"values": [{"extracted_value": 55}]},
                    {"values": []}
                ]}
            })))
            .mount(&server)
            .await;

        let client = SerpTrendsClient::new().with_base_url(&server.uri());
        let series = client.interest_over_time("invoice app", "k1").await.unwrap();
        assert_eq!(series, vec![40, 55]);
        assert_eq!(client.calls_made(), 1);
    }

    #[tokio::test]
    async fn rate_limit_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = SerpTrendsClient::new().with_base_url(&server.uri());
        let err = client.interest_over_time("kw", "k1").await.unwrap_err();
        assert!(matches!(err, TrendError::RateLimited));
    }

    #[tokio::test]
    async fn missing_related_block_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = SerpTrendsClient::new().with_base_url(&server.uri());
        let related = client.related_queries("kw", "k1").await.unwrap();
        assert!(related.rising.is_empty());
        assert!(related.top.is_empty());
    }
}
