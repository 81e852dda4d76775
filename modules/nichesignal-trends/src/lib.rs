pub mod error;
pub mod fallback;
pub mod metrics;
pub mod quota;
pub mod serpapi;
pub mod validator;

pub use error::TrendError;
pub use fallback::WidgetTrendsClient;
pub use quota::{FileQuotaStore, KeySlot, MemoryQuotaStore, QuotaLedger, QuotaState, QuotaStore};
pub use serpapi::{RelatedTerms, SerpTrendsClient};
pub use validator::{TrendKeys, TrendValidator};
