use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use nichesignal_common::Config;
use nichesignal_discovery::embedder::Embedder;
use nichesignal_discovery::sources::{ProductHuntSource, RedditSource, XSource, YouTubeSource};
use nichesignal_discovery::{DiscoveryDeps, DiscoveryPipeline, PipelineConfig};
use nichesignal_sources::{ProductHuntClient, RedditClient, XScraperClient, YouTubeClient};
use nichesignal_trends::{
    FileQuotaStore, QuotaLedger, SerpTrendsClient, TrendKeys, TrendValidator, WidgetTrendsClient,
};

const EXTRACTION_MODEL: &str = "claude-haiku-4-5-20251001";

#[derive(Parser)]
#[command(name = "nichesignal", about = "Mine cross-platform pain points into ranked app opportunities")]
struct Args {
    /// Scale the sweep down for a cheap smoke run.
    #[arg(long)]
    test_mode: bool,

    /// How many opportunities to keep in the briefing.
    #[arg(long, default_value_t = 20)]
    top_n: usize,

    /// Write the briefing as JSON to this path as well.
    #[arg(long)]
    out: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let validator = TrendValidator::new(
        SerpTrendsClient::new(),
        WidgetTrendsClient::new(),
        QuotaLedger::new(
            Box::new(FileQuotaStore::new(&config.quota_state_path)),
            config.serpapi_monthly_limit,
        ),
        TrendKeys {
            one: config.serpapi_key_one.clone(),
            two: config.serpapi_key_two.clone(),
        },
    );

    let deps = DiscoveryDeps {
        sources: vec![
            Arc::new(RedditSource::new(RedditClient::new())),
            Arc::new(XSource::new(XScraperClient::new(config.apify_api_token.clone()))),
            Arc::new(YouTubeSource::new(YouTubeClient::new(config.youtube_api_key.clone()))),
            Arc::new(ProductHuntSource::new(ProductHuntClient::new(
                config.producthunt_token.clone(),
            ))),
        ],
        llm: Arc::new(Claude::new(&config.anthropic_api_key, EXTRACTION_MODEL)),
        embedder: Arc::new(Embedder::new(&config.voyage_api_key)),
        validator: Arc::new(validator),
    };

    let pipeline = DiscoveryPipeline::new(
        deps,
        PipelineConfig {
            top_n: args.top_n,
            test_mode: args.test_mode || config.test_mode,
            ..PipelineConfig::default()
        },
    );

    let briefing = pipeline.run().await?;

    println!("{briefing}");
    if let Some(path) = args.out {
        std::fs::write(&path, serde_json::to_string_pretty(&briefing)?)?;
        info!(path = %path.display(), "Briefing written");
    }

    Ok(())
}
