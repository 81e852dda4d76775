use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI providers
    pub anthropic_api_key: String,
    pub voyage_api_key: String,

    // Content sources
    pub apify_api_token: String,
    pub youtube_api_key: String,
    pub producthunt_token: String,

    // Trend validation (two independent monthly quotas)
    pub serpapi_key_one: String,
    pub serpapi_key_two: String,
    pub serpapi_monthly_limit: u32,
    pub quota_state_path: PathBuf,

    // Pipeline
    pub test_mode: bool,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            voyage_api_key: required_env("VOYAGE_API_KEY"),
            apify_api_token: required_env("APIFY_API_TOKEN"),
            youtube_api_key: required_env("YOUTUBE_API_KEY"),
            producthunt_token: required_env("PRODUCTHUNT_TOKEN"),
            serpapi_key_one: required_env("SERPAPI_KEY_ONE"),
            serpapi_key_two: required_env("SERPAPI_KEY_TWO"),
            serpapi_monthly_limit: env::var("SERPAPI_MONTHLY_LIMIT")
                .unwrap_or_else(|_| "250".to_string())
                .parse()
                .expect("SERPAPI_MONTHLY_LIMIT must be a number"),
            quota_state_path: env::var("QUOTA_STATE_PATH")
                .unwrap_or_else(|_| "serpapi_quota.json".to_string())
                .into(),
            test_mode: env::var("TEST_MODE").map(|v| v == "1" || v == "true").unwrap_or(false),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
