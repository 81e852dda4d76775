use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use nichesignal_common::{TrendDirection, TrendProvider, TrendValidation, UsageCounters};

use crate::error::TrendError;
use crate::fallback::WidgetTrendsClient;
use crate::metrics;
use crate::quota::{KeySlot, QuotaLedger};
use crate::serpapi::{RelatedTerms, SerpTrendsClient};

/// How many validations run in flight at once in `validate_batch`.
const BATCH_CONCURRENCY: usize = 4;

/// The two SerpApi keys, each with its own monthly allowance.
pub struct TrendKeys {
    pub one: String,
    pub two: String,
}

impl TrendKeys {
    fn for_slot(&self, slot: KeySlot) -> &str {
        match slot {
            KeySlot::One => &self.one,
            KeySlot::Two => &self.two,
        }
    }
}

enum SerpRequest<'a> {
    Series(&'a str),
    Related(&'a str),
}

enum SerpResponse {
    Series(Vec<i64>),
    Related(RelatedTerms),
}

/// Demand validation for keywords, three tiers deep: SerpApi (two keys),
/// then the widget endpoint, then a zero-signal floor. `validate` never
/// returns an error — a keyword that can't be validated scores zero.
pub struct TrendValidator {
    primary: SerpTrendsClient,
    fallback: WidgetTrendsClient,
    ledger: QuotaLedger,
    keys: TrendKeys,
}

impl TrendValidator {
    pub fn new(
        primary: SerpTrendsClient,
        fallback: WidgetTrendsClient,
        ledger: QuotaLedger,
        keys: TrendKeys,
    ) -> Self {
        Self {
            primary,
            fallback,
            ledger,
            keys,
        }
    }

    async fn serp_call(
        &self,
        request: &SerpRequest<'_>,
        api_key: &str,
    ) -> Result<SerpResponse, TrendError> {
        match request {
            SerpRequest::Series(keyword) => self
                .primary
                .interest_over_time(keyword, api_key)
                .await
                .map(SerpResponse::Series),
            SerpRequest::Related(keyword) => self
                .primary
                .related_queries(keyword, api_key)
                .await
                .map(SerpResponse::Related),
        }
    }

    /// One primary sub-call under quota: pick the active key, and on a 429
    /// mark that key exhausted and retry once with the other key.
    async fn with_rotation(&self, request: SerpRequest<'_>) -> Result<SerpResponse, TrendError> {
        let slot = self.ledger.active_slot().ok_or(TrendError::QuotaExhausted)?;

        match self.serp_call(&request, self.keys.for_slot(slot)).await {
            Ok(response) => {
                self.ledger.record_call(slot);
                Ok(response)
            }
            Err(TrendError::RateLimited) => {
                self.ledger.mark_exhausted(slot);
                let other = slot.other();
                if self.ledger.active_slot() != Some(other) {
                    return Err(TrendError::QuotaExhausted);
                }
                match self.serp_call(&request, self.keys.for_slot(other)).await {
                    Ok(response) => {
                        self.ledger.record_call(other);
                        Ok(response)
                    }
                    Err(TrendError::RateLimited) => {
                        self.ledger.mark_exhausted(other);
                        Err(TrendError::QuotaExhausted)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn validate_primary(&self, keyword: &str) -> Result<TrendValidation, TrendError> {
        let series = match self.with_rotation(SerpRequest::Series(keyword)).await? {
            SerpResponse::Series(s) => s,
            SerpResponse::Related(_) => unreachable!("series request"),
        };

        // Related terms are enrichment — losing them does not demote the
        // whole validation a tier.
        let related = match self.with_rotation(SerpRequest::Related(keyword)).await {
            Ok(SerpResponse::Related(r)) => r,
            Ok(SerpResponse::Series(_)) => unreachable!("related request"),
            Err(e) => {
                warn!(keyword, error = %e, "Related-query fetch failed, continuing without");
                RelatedTerms::default()
            }
        };

        Ok(build_validation(
            keyword,
            &series,
            &related,
            TrendProvider::SerpApi,
        ))
    }

    async fn validate_fallback(&self, keyword: &str) -> Result<TrendValidation, TrendError> {
        let series = self.fallback.interest_over_time(keyword).await?;
        Ok(build_validation(
            keyword,
            &series,
            &RelatedTerms::default(),
            TrendProvider::Widget,
        ))
    }

    /// Validate one keyword. Infallible by contract: primary, then
    /// fallback, then zero signal.
    pub async fn validate(&self, keyword: &str) -> TrendValidation {
        match self.validate_primary(keyword).await {
            Ok(validation) => validation,
            Err(primary_err) => {
                warn!(keyword, error = %primary_err, "Primary trend provider failed, trying fallback");
                match self.validate_fallback(keyword).await {
                    Ok(validation) => validation,
                    Err(fallback_err) => {
                        warn!(keyword, error = %fallback_err, "Fallback trend provider failed, zero signal");
                        TrendValidation::zero_signal(keyword)
                    }
                }
            }
        }
    }

    /// Validate many keywords concurrently, preserving input order. Each
    /// call is isolated — one dead keyword never poisons the batch.
    pub async fn validate_batch(&self, keywords: &[String]) -> Vec<TrendValidation> {
        info!(count = keywords.len(), "Validating keyword batch");
        let owned: Vec<String> = keywords.to_vec();
        stream::iter(owned.into_iter().map(|kw| async move { self.validate(&kw).await }))
            .buffered(BATCH_CONCURRENCY)
            .collect()
            .await
    }

    /// Per-provider call counts for the run report.
    pub fn usage(&self) -> UsageCounters {
        let mut usage = UsageCounters::default();
        usage.record("serpapi_calls", self.primary.calls_made());
        usage.record("trends_widget_calls", self.fallback.calls_made());
        usage
    }
}

fn build_validation(
    keyword: &str,
    series: &[i64],
    related: &RelatedTerms,
    provider: TrendProvider,
) -> TrendValidation {
    let interest = metrics::interest_score(series);
    let momentum = metrics::momentum(series);
    let direction = TrendDirection::from_momentum(momentum);
    let related_queries = metrics::pick_related(&related.rising, &related.top, 5);
    let audience_tags = metrics::classify_audience(keyword, &related_queries);
    let trend_score = metrics::trend_score(interest, momentum, related_queries.len(), &audience_tags);

    TrendValidation {
        keyword: keyword.to_string(),
        interest_score: interest,
        momentum,
        direction,
        related_queries,
        audience_tags,
        trend_score,
        provider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::{MemoryQuotaStore, QuotaState};
    use chrono::Utc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn month_now() -> String {
        Utc::now().format("%Y-%m").to_string()
    }

    fn validator_against(
        serp_url: &str,
        widget_url: &str,
        state: Option<QuotaState>,
        limit: u32,
    ) -> TrendValidator {
        let store = match state {
            Some(s) => MemoryQuotaStore::preloaded(s),
            None => MemoryQuotaStore::new(),
        };
        TrendValidator::new(
            SerpTrendsClient::new().with_base_url(serp_url),
            WidgetTrendsClient::new().with_base_url(widget_url),
            QuotaLedger::new(Box::new(store), limit),
            TrendKeys {
                one: "key-one".to_string(),
                two: "key-two".to_string(),
            },
        )
    }

    fn series_body(values: &[i64]) -> serde_json::Value {
        serde_json::json!({
            "interest_over_time": {"timeline_data": values
                .iter()
                .map(|v| serde_json::json!({"values": [{"extracted_value": v}]}))
                .collect::<Vec<_>>()}
        })
    }

    #[tokio::test]
    async fn exhausted_key_one_uses_key_two_exclusively() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api_key", "key-two"))
            .respond_with(ResponseTemplate::new(200).set_body_json(series_body(&[50; 14])))
            .mount(&server)
            .await;

        let state = QuotaState {
            month: month_now(),
            used_one: 250,
            used_two: 0,
        };
        let v = validator_against(&server.uri(), &server.uri(), Some(state), 250);

        let validation = v.validate("standup tracker").await;
        assert_eq!(validation.provider, TrendProvider::SerpApi);
        assert_eq!(validation.interest_score, 50);
        // Series + related, both on key two.
        assert_eq!(v.ledger.used(KeySlot::Two), 2);
    }

    #[tokio::test]
    async fn rate_limited_key_rotates_mid_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api_key", "key-one"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api_key", "key-two"))
            .respond_with(ResponseTemplate::new(200).set_body_json(series_body(&[30; 7])))
            .mount(&server)
            .await;

        let v = validator_against(&server.uri(), &server.uri(), None, 250);
        let validation = v.validate("kw").await;

        assert_eq!(validation.provider, TrendProvider::SerpApi);
        assert_eq!(v.ledger.used(KeySlot::One), 250); // marked exhausted
        assert_eq!(v.ledger.used(KeySlot::Two), 2);
    }

    #[tokio::test]
    async fn both_keys_exhausted_falls_back_to_widget() {
        let serp = MockServer::start().await;
        let widget = MockServer::start().await;
        let body = ")]}',\n{\"default\":{\"timelineData\":[{\"value\":[20]},{\"value\":[40]}]}}";
        Mock::given(method("GET"))
            .and(path("/trends/api/widgetdata/multiline"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&widget)
            .await;

        let state = QuotaState {
            month: month_now(),
            used_one: 250,
            used_two: 250,
        };
        let v = validator_against(&serp.uri(), &widget.uri(), Some(state), 250);

        let validation = v.validate("kw").await;
        assert_eq!(validation.provider, TrendProvider::Widget);
        assert_eq!(validation.interest_score, 30);
        assert!(validation.related_queries.is_empty());
        assert_eq!(v.usage().get("serpapi_calls"), 0);
    }

    #[tokio::test]
    async fn both_providers_dead_yields_zero_signal() {
        let serp = MockServer::start().await;
        let widget = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&serp)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&widget)
            .await;

        let v = validator_against(&serp.uri(), &widget.uri(), None, 250);
        let validation = v.validate("dead keyword").await;

        assert_eq!(validation.provider, TrendProvider::NoData);
        assert_eq!(validation.interest_score, 0);
        assert_eq!(validation.trend_score, 0);
        assert_eq!(validation.direction, TrendDirection::Stable);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_isolates_failures() {
        let serp = MockServer::start().await;
        let widget = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(series_body(&[80; 7])))
            .mount(&serp)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&serp)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&widget)
            .await;

        let v = validator_against(&serp.uri(), &widget.uri(), None, 250);
        let results = v
            .validate_batch(&["good".to_string(), "bad".to_string()])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].keyword, "good");
        assert_eq!(results[0].interest_score, 80);
        assert_eq!(results[1].provider, TrendProvider::NoData);
    }
}
