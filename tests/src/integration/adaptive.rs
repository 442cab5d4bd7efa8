//! # Historical-Depth Flows
//!
//! The confirmed-archive sample grows as a run finds archive nodes and
//! moves the adaptive probe target for later candidates.

use archive_discovery::testing::{MockChainClient, MockNodeSource, NodeScript};
use archive_discovery::{ConfigPatch, Event, LogLevel, FIXED_PROBE_DEPTH};

use super::support::Session;

fn queries_for(clients: &MockChainClient, url: &str) -> Vec<u64> {
    clients
        .block_queries()
        .into_iter()
        .filter(|(endpoint, _)| endpoint == url)
        .map(|(_, height)| height)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_median_target_follows_confirmed_archives() {
    let directory = MockNodeSource::with_urls([
        "wss://a.example",
        "wss://b.example",
        "wss://pruned.example",
        "wss://c.example",
    ]);
    let clients = MockChainClient::new()
        .with_node("wss://a.example", NodeScript::at_height(80_000_000))
        .with_node("wss://b.example", NodeScript::at_height(100_000_000))
        .with_node(
            "wss://pruned.example",
            NodeScript::at_height(200_000_000).missing(200_000_000 - FIXED_PROBE_DEPTH),
        )
        .with_node("wss://c.example", NodeScript::at_height(120_000_000));
    let mut session = Session::spawn(directory, clients.clone());
    session.init_with_budget(4).await;
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    // First archive has no sample yet, so only the fixed probe runs.
    assert_eq!(queries_for(&clients, "wss://a.example"), vec![79_136_000]);
    // Sample {80M}: median depth 40M.
    assert_eq!(
        queries_for(&clients, "wss://b.example"),
        vec![99_136_000, 60_000_000]
    );
    // Sample {80M, 100M}: median 90M, depth 45M. The pruned node never
    // entered the sample.
    assert_eq!(
        queries_for(&clients, "wss://c.example"),
        vec![119_136_000, 75_000_000]
    );

    assert_eq!(snapshot.counters.archive, 3);
    assert_eq!(snapshot.counters.non_archive, 1);
    let heights: Vec<u64> = snapshot
        .archive_records
        .iter()
        .map(|r| r.block_height)
        .collect();
    assert_eq!(heights, vec![80_000_000, 100_000_000, 120_000_000]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_fixed_depth_block_reports_reason() {
    let mut session = Session::spawn(
        MockNodeSource::with_urls(["wss://pruned.example"]),
        MockChainClient::new().with_node(
            "wss://pruned.example",
            NodeScript::at_height(60_000_000).missing(59_136_000),
        ),
    );
    session.init_with_budget(1).await;
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.non_archive, 1);
    assert!(snapshot.archive_records.is_empty());
    assert!(!session.kinds().contains(&"ARCHIVE_FOUND"));
    let verdicts = session.logs(LogLevel::Info);
    assert!(verdicts.iter().any(|m| m.contains(
        "Non-archive node wss://pruned.example at height 60000000, \
         fixed-depth probe at height 59136000 failed: block not found"
    )));
}

#[tokio::test(start_paused = true)]
async fn test_failing_median_probe_is_a_verdict_not_an_error() {
    let directory = MockNodeSource::with_urls(["wss://a.example", "wss://b.example"]);
    let clients = MockChainClient::new()
        .with_node("wss://a.example", NodeScript::at_height(80_000_000))
        .with_node(
            "wss://b.example",
            NodeScript::at_height(100_000_000).failing(60_000_000),
        );
    let mut session = Session::spawn(directory, clients);
    session.init_with_budget(2).await;
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.archive, 1);
    assert_eq!(snapshot.counters.non_archive, 1);
    assert_eq!(snapshot.counters.errors, 0);
    assert!(session
        .logs(LogLevel::Info)
        .iter()
        .any(|m| m.contains("median-depth probe at height 60000000 failed")));
}

#[tokio::test(start_paused = true)]
async fn test_threshold_alone_when_verification_disabled() {
    let directory = MockNodeSource::with_urls(["wss://tall.example", "wss://short.example"]);
    let clients = MockChainClient::new()
        .with_node(
            "wss://tall.example",
            NodeScript::at_height(60_000_000).missing(59_136_000),
        )
        .with_node("wss://short.example", NodeScript::at_height(49_999_999));
    let mut session = Session::spawn(directory, clients.clone());
    session
        .controller
        .init(
            "mock",
            ConfigPatch {
                max_nodes: Some(2),
                verify_historical_depth: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    session.controller.start().await.unwrap();

    let found = session.until("ARCHIVE_FOUND").await;
    let snapshot = session.run_to_stop().await;

    match found {
        Event::ArchiveFound(result) => {
            assert_eq!(result.identity.as_str(), "wss://tall.example");
            assert_eq!(result.server_label, "mock-1.0");
            assert_eq!(result.network_id.as_deref(), Some("mainnet"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(clients.block_queries().is_empty());
    assert_eq!(snapshot.counters.archive, 1);
    assert_eq!(snapshot.counters.non_archive, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lowered_threshold_applies_to_next_cycle() {
    let mut session = Session::spawn(
        MockNodeSource::with_urls(["wss://small.example"]),
        MockChainClient::new().with_node("wss://small.example", NodeScript::at_height(2_000_000)),
    );
    session
        .controller
        .init(
            "mock",
            ConfigPatch {
                max_nodes: Some(1),
                archive_threshold: Some(1_000_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.archive, 1);
    assert_eq!(snapshot.archive_records[0].block_height, 2_000_000);
}
