use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use crate::error::TrendError;

const TRENDS_BASE_URL: &str = "https://trends.google.com";

/// Pause before each request, plus jitter. The endpoint is unofficial and
/// unmetered; hitting it at API speed gets the IP blocked within minutes.
const POLITENESS_DELAY_MS: u64 = 1200;
const JITTER_MS: u64 = 600;

#[derive(Debug, Deserialize)]
struct WidgetResponse {
    default: WidgetDefault,
}

#[derive(Debug, Deserialize)]
struct WidgetDefault {
    #[serde(rename = "timelineData", default)]
    timeline_data: Vec<WidgetPoint>,
}

#[derive(Debug, Deserialize)]
struct WidgetPoint {
    #[serde(default)]
    value: Vec<i64>,
}

/// Best-effort secondary provider: Google Trends' own widget endpoint.
///
/// Used only when SerpApi is exhausted or failing. Interest series only — no
/// related queries on this path.
pub struct WidgetTrendsClient {
    http: reqwest::Client,
    base_url: String,
    calls: AtomicU64,
}

impl WidgetTrendsClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: TRENDS_BASE_URL.to_string(),
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

    /// Interest values over the trailing window, oldest first.
    pub async fn interest_over_time(&self, keyword: &str) -> Result<Vec<i64>, TrendError> {
        let jitter = rand::rng().random_range(0..JITTER_MS);
        tokio::time::sleep(Duration::from_millis(POLITENESS_DELAY_MS + jitter)).await;

        let url = format!("{}/trends/api/widgetdata/multiline", self.base_url);

        debug!(keyword, "Widget trends request");
        self.calls.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .http
            .get(&url)
            .query(&[("hl", "en-US"), ("tz", "0"), ("q", keyword)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TrendError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        // The endpoint prefixes every body with an anti-JSON-hijacking
        // garbage line that must be stripped before parsing.
        let body = resp.text().await?;
        let json = body
            .strip_prefix(")]}',")
            .map(str::trim_start)
            .unwrap_or(&body);

        let parsed: WidgetResponse = serde_json::from_str(json)?;
        Ok(parsed
            .default
            .timeline_data
            .into_iter()
            .filter_map(|p| p.value.into_iter().next())
            .collect())
    }
}

impl Default for WidgetTrendsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn strips_hijack_prefix_and_parses() {
        let server = MockServer::start().await;
        let body = ")]}',\n{\"default\":{\"timelineData\":[{\"value\":[61]},{\"value\":[58]}]}}";
        Mock::given(method("GET"))
            .and(path("/trends/api/widgetdata/multiline"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = WidgetTrendsClient::new().with_base_url(&server.uri());
        let series = client.interest_over_time("meal planner").await.unwrap();
        assert_eq!(series, vec![61, 58]);
    }

    #[tokio::test]
    async fn http_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = WidgetTrendsClient::new().with_base_url(&server.uri());
        let err = client.interest_over_time("kw").await.unwrap_err();
        assert!(matches!(err, TrendError::Api { status: 503, .. }));
    }
}
