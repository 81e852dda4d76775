use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::report::OpportunityBriefing;

/// Persistence seam for briefings. The weekly aggregation reads daily
/// history back out through `range`.
#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn create(&self, briefing: &OpportunityBriefing) -> Result<()>;
    async fn latest(&self) -> Result<Option<OpportunityBriefing>>;
    async fn range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OpportunityBriefing>>;
}

/// In-memory store for tests and single-shot runs.
#[derive(Default)]
pub struct MemoryInsightStore {
    briefings: Mutex<Vec<OpportunityBriefing>>,
}

impl MemoryInsightStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InsightStore for MemoryInsightStore {
    async fn create(&self, briefing: &OpportunityBriefing) -> Result<()> {
        self.briefings.lock().unwrap().push(briefing.clone());
        Ok(())
    }

    async fn latest(&self) -> Result<Option<OpportunityBriefing>> {
        let briefings = self.briefings.lock().unwrap();
        Ok(briefings
            .iter()
            .max_by_key(|b| b.generated_at)
            .cloned())
    }

    async fn range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OpportunityBriefing>> {
        let briefings = self.briefings.lock().unwrap();
        Ok(briefings
            .iter()
            .filter(|b| b.generated_at >= from && b.generated_at < to)
            .cloned()
            .collect())
    }
}
