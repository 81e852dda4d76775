//! Full-pipeline tests over the mock seams: wiring, fan-out/fan-in merge
//! order, degradation, and the empty-cycle contract.

use std::sync::Arc;

use nichesignal_common::SourceKind;
use nichesignal_discovery::testing::{
    record, FixedEmbedder, MockCompletion, MockSource, MockValidator, TEST_EMBEDDING_DIM,
};
use nichesignal_discovery::{DiscoveryDeps, DiscoveryPipeline, PipelineConfig};

fn config() -> PipelineConfig {
    PipelineConfig {
        test_mode: true,
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn full_run_produces_ranked_briefing() {
    let sources: Vec<Arc<dyn nichesignal_discovery::traits::RecordSource>> = vec![
        Arc::new(MockSource::new(
            SourceKind::Reddit,
            vec![
                record(SourceKind::Reddit, "tracking hours rant", 80),
                record(SourceKind::Reddit, "other rant", 20),
            ],
        )),
        Arc::new(MockSource::new(
            SourceKind::X,
            vec![record(SourceKind::X, "invoicing complaint", 10)],
        )),
        Arc::new(MockSource::new(
            SourceKind::YouTube,
            vec![record(SourceKind::YouTube, "reminder complaint", 5)],
        )),
        Arc::new(MockSource::new(
            SourceKind::ProductHunt,
            vec![record(
                SourceKind::ProductHunt,
                "TimeTrack Pro: time tracking for freelancers",
                150,
            )],
        )),
    ];

    // One scripted response per model call, in deterministic branch order:
    // four extracts, then filter, then scorer.
    let llm = Arc::new(MockCompletion::scripted(&[
        "ITEM: 1\nQUOTE: I bill from memory\nPROBLEM: tracking billable hours is manual",
        "ITEM: 1\nQUOTE: invoices eat my friday\nPROBLEM: invoicing clients takes a whole day",
        "ITEM: 1\nQUOTE: always forget\nPROBLEM: no reminders for recurring invoices",
        "ITEM: 1\nQUOTE: three tools\nPROBLEM: freelancers juggle three billing tools",
        "1 | tracking billable hours is manual\n2 | invoicing clients takes a whole day\n4 | freelancers juggle three billing tools",
        "1 | time tracking | BillableBot | 70 | 90\n2 | invoice automation | InvoicePilot | 60 | 80\n3 | freelance billing | OneBill | 50 | 40",
    ]));

    let validator = Arc::new(
        MockValidator::new()
            .with_interest("time tracking", 70)
            .with_interest("invoice automation", 30),
    );

    let pipeline = DiscoveryPipeline::new(
        DiscoveryDeps {
            sources,
            llm,
            embedder: Arc::new(FixedEmbedder::new(TEST_EMBEDDING_DIM)),
            validator,
        },
        config(),
    );

    let briefing = pipeline.run().await.unwrap();

    assert_eq!(briefing.total_data_points, 5);
    assert_eq!(briefing.pain_points_extracted, 4);
    assert_eq!(briefing.candidates_filtered, 3);
    assert_eq!(briefing.keywords_validated, 3);
    assert!(briefing.branch_errors.is_empty());

    // Scores: (70,80,90)→78, (0,75,40)→38, (30,10,80)→32, ranked descending.
    let concepts: Vec<_> = briefing
        .top_opportunities
        .iter()
        .map(|o| o.app_concept.as_str())
        .collect();
    assert_eq!(concepts, vec!["BillableBot", "OneBill", "InvoicePilot"]);
    assert_eq!(briefing.top_opportunities[0].opportunity_score, 78);
    assert_eq!(briefing.top_opportunities[0].demand_score, 70);
    assert_eq!(briefing.top_opportunities[0].virality_score, 80);

    // The time-tracking launch shows up as competing-product evidence.
    assert!(briefing.top_opportunities[0].similar_products[0].starts_with("TimeTrack Pro"));

    // 4 extracts + filter + scorer.
    assert_eq!(briefing.usage.get("llm_calls"), 6);
    assert_eq!(briefing.usage.get("embedding_batches"), 1);
    assert_eq!(briefing.usage.get("reddit_calls"), 1);
    assert!(briefing.estimated_cost_cents > 0);
}

#[tokio::test]
async fn empty_collect_is_a_successful_empty_briefing() {
    let sources: Vec<Arc<dyn nichesignal_discovery::traits::RecordSource>> = SourceKind::ALL
        .iter()
        .map(|k| Arc::new(MockSource::new(*k, vec![])) as _)
        .collect();

    let pipeline = DiscoveryPipeline::new(
        DiscoveryDeps {
            sources,
            llm: Arc::new(MockCompletion::scripted(&[])),
            embedder: Arc::new(FixedEmbedder::new(TEST_EMBEDDING_DIM)),
            validator: Arc::new(MockValidator::new()),
        },
        config(),
    );

    let briefing = pipeline.run().await.unwrap();

    assert!(briefing.top_opportunities.is_empty());
    assert_eq!(briefing.total_data_points, 0);
    assert_eq!(briefing.pain_points_extracted, 0);
    assert!(briefing.branch_errors.is_empty());
    // Nothing to extract, filter, or score — no model calls at all.
    assert_eq!(briefing.usage.get("llm_calls"), 0);
}

#[tokio::test]
async fn failed_branches_degrade_without_failing_the_run() {
    let sources: Vec<Arc<dyn nichesignal_discovery::traits::RecordSource>> = vec![
        Arc::new(MockSource::new(
            SourceKind::Reddit,
            vec![record(SourceKind::Reddit, "rant", 40)],
        )),
        Arc::new(MockSource::failing(SourceKind::X)),
        Arc::new(MockSource::failing(SourceKind::YouTube)),
        Arc::new(MockSource::new(
            SourceKind::ProductHunt,
            vec![record(SourceKind::ProductHunt, "Tool: fixes things", 90)],
        )),
    ];

    let llm = Arc::new(MockCompletion::scripted(&[
        "ITEM: 1\nQUOTE: q\nPROBLEM: expense tracking is manual",
        "ITEM: 1\nQUOTE: q\nPROBLEM: receipts pile up unscanned",
        "1 | expense tracking is manual\n2 | receipts pile up unscanned",
        "1 | expense tracker | SnapLedger | 60 | 85\n2 | receipt scanner | ReceiptBin | 55 | 75",
    ]));

    let pipeline = DiscoveryPipeline::new(
        DiscoveryDeps {
            sources,
            llm,
            embedder: Arc::new(FixedEmbedder::new(TEST_EMBEDDING_DIM)),
            validator: Arc::new(MockValidator::new().with_interest("expense tracker", 50)),
        },
        config(),
    );

    let briefing = pipeline.run().await.unwrap();

    // Two dead sources → two notes, but the run is a success with data
    // from the two healthy ones.
    assert_eq!(briefing.branch_errors.len(), 2);
    assert_eq!(briefing.total_data_points, 2);
    assert_eq!(briefing.top_opportunities.len(), 2);
}

#[tokio::test]
async fn no_sources_is_a_setup_error() {
    let pipeline = DiscoveryPipeline::new(
        DiscoveryDeps {
            sources: vec![],
            llm: Arc::new(MockCompletion::scripted(&[])),
            embedder: Arc::new(FixedEmbedder::new(TEST_EMBEDDING_DIM)),
            validator: Arc::new(MockValidator::new()),
        },
        config(),
    );

    assert!(pipeline.run().await.is_err());
}
