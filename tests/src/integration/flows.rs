//! # Run Lifecycle Flows
//!
//! Budget, dedup, pre-init buffering, failure containment and control
//! misuse, each driven through the controller against scripted nodes.

use std::time::Duration;

use archive_discovery::domain::invariants;
use archive_discovery::testing::{MockChainClient, MockNodeSource, NodeScript};
use archive_discovery::{ConfigPatch, DiscoveryApi, Event, LogLevel, NodeEndpoint, StateSnapshot};
use proptest::prelude::*;
use tokio::time::Instant;

use super::support::{numbered_urls, Session};

fn scripted(urls: &[String], script: NodeScript) -> MockChainClient {
    let clients = MockChainClient::new();
    for url in urls {
        clients.script(url.clone(), script.clone());
    }
    clients
}

// =============================================================================
// BUDGET
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_budget_stops_run_without_stop_command() {
    let urls = numbered_urls(8);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(1_000)),
    );
    session.init_with_budget(5).await;
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.tested, 5);
    assert_eq!(snapshot.counters.non_archive, 5);
    assert_eq!(snapshot.index, 5);
    assert!(!snapshot.running);
    assert_eq!(session.clients.created().len(), 5);
    assert!(session
        .logs(LogLevel::Info)
        .iter()
        .any(|m| m.contains("Node budget exhausted after 5 nodes")));
    assert!(!session.controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_restart_begins_at_index_zero_and_skips_known_nodes() {
    let urls = numbered_urls(2);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(1_000)),
    );
    session.init_with_budget(2).await;

    session.controller.start().await.unwrap();
    let first = session.run_to_stop().await;
    session.controller.start().await.unwrap();
    let second = session.run_to_stop().await;

    assert_eq!(first.counters.tested, 2);
    assert_eq!(second.counters.tested, 2);
    assert_eq!(second.counters.skipped, 2);
    assert_eq!(second.index, 2);
    assert_eq!(session.clients.created().len(), 2);
}

// =============================================================================
// DEDUP
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_same_identity_is_tested_once() {
    let mut session = Session::spawn(
        MockNodeSource::with_urls(["wss://Node.Example/", "wss://node.example"]),
        MockChainClient::new().with_node("wss://Node.Example/", NodeScript::at_height(1_000)),
    );
    session.init_with_budget(2).await;
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.tested, 1);
    assert_eq!(snapshot.counters.skipped, 1);
    assert_eq!(snapshot.index, 2);
    assert_eq!(session.clients.created(), vec!["wss://Node.Example/".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_dedup_can_be_disabled() {
    let urls = vec!["wss://node.example".to_string(), "wss://NODE.example".to_string()];
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(1_000)),
    );
    session
        .controller
        .init(
            "mock",
            ConfigPatch {
                max_nodes: Some(2),
                skip_duplicate_check: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.tested, 2);
    assert_eq!(snapshot.counters.skipped, 0);
    assert_eq!(session.clients.created().len(), 2);
}

// =============================================================================
// INITIALIZATION
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_commands_before_init_are_replayed_in_order() {
    let urls = numbered_urls(1);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(1_000)),
    );
    session.controller.handle().start().await.unwrap();
    session.controller.handle().get_state().await.unwrap();
    session.init_with_budget(1).await;

    session.run_to_stop().await;

    let kinds = session.kinds();
    assert_eq!(
        &kinds[..6],
        &["INITIALIZED", "LOG", "STARTED", "LOG", "STATE_UPDATE", "CONFIG_UPDATED"]
    );
    assert_eq!(session.clients.created().len(), 1);
}

#[tokio::test]
async fn test_failed_init_can_be_retried() {
    let mut session = Session::spawn(MockNodeSource::default(), MockChainClient::new());
    session.module.fail_next_loads(1);

    let err = session
        .controller
        .init("mock", ConfigPatch::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not available"));
    assert!(!session.controller.is_initialized());

    session.controller.handle().start().await.unwrap();
    session.init_with_budget(1).await;
    session.until("STARTED").await;

    assert!(session.controller.is_initialized());
    assert_eq!(session.module.loads().len(), 2);
    let errors = session.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "Failed to initialize client module");
}

#[tokio::test]
async fn test_second_init_is_acknowledged_without_reloading() {
    let mut session = Session::spawn(MockNodeSource::default(), MockChainClient::new());
    session.init_with_budget(1).await;
    session.init_with_budget(1).await;

    assert_eq!(session.module.loads().len(), 1);
}

// =============================================================================
// STATE QUERIES
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_get_state_is_idempotent() {
    let urls = numbered_urls(3);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(60_000_000)),
    );
    session.init_with_budget(3).await;
    session.controller.start().await.unwrap();
    let after_run = session.run_to_stop().await;

    session.controller.get_state().await.unwrap();
    let first = session.snapshot_event().await;
    session.controller.get_state().await.unwrap();
    let second = session.snapshot_event().await;

    assert_eq!(first, after_run);
    assert_eq!(first, second);
    assert_eq!(first.archive_records.len(), 3);
    assert_eq!(session.controller.archive_nodes().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reset_clears_ledger_when_idle() {
    let urls = numbered_urls(2);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(60_000_000)),
    );
    session.init_with_budget(2).await;
    session.controller.start().await.unwrap();
    session.run_to_stop().await;

    session.controller.reset().await.unwrap();
    let cleared = session.snapshot_event().await;

    assert_eq!(cleared.counters.tested, 0);
    assert!(cleared.archive_records.is_empty());
    assert!(session.controller.archive_nodes().is_empty());

    session.controller.start().await.unwrap();
    let rerun = session.run_to_stop().await;
    assert_eq!(rerun.counters.tested, 2);
    assert_eq!(rerun.counters.skipped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_rejected_while_running() {
    let urls = numbered_urls(2);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(1_000)),
    );
    session.init_with_budget(100).await;
    session.controller.start().await.unwrap();
    session.until("STARTED").await;

    session.controller.reset().await.unwrap();
    let event = session.until("ERROR").await;
    session.controller.stop().await.unwrap();
    let snapshot = session.run_to_stop().await;

    match event {
        Event::Error(entry) => {
            assert_eq!(entry.message, "Cannot reset a running discovery");
            assert_eq!(entry.error.as_deref(), Some("Command rejected: RESET while running"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!snapshot.running);
}

// =============================================================================
// SOURCE EXHAUSTION
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_exhausted_source_holds_index_until_stopped() {
    let urls = numbered_urls(3);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(1_000)),
    );
    session.init_with_budget(100).await;
    session.controller.start().await.unwrap();
    session.until("STARTED").await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    session.controller.stop().await.unwrap();
    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.index, 3);
    assert_eq!(snapshot.counters.tested, 3);
    let polls_past_end = session
        .directory
        .lookups()
        .iter()
        .filter(|&&index| index == 3)
        .count();
    assert!(polls_past_end > 1);
}

#[tokio::test(start_paused = true)]
async fn test_growing_source_is_picked_up() {
    let directory = MockNodeSource::with_urls(["wss://first.example"]);
    let clients = MockChainClient::new()
        .with_node("wss://first.example", NodeScript::at_height(1_000))
        .with_node("wss://late.example", NodeScript::at_height(60_000_000));
    let mut session = Session::spawn(directory, clients);
    session.init_with_budget(2).await;
    session.controller.start().await.unwrap();
    session.until("STARTED").await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    session
        .directory
        .push(NodeEndpoint::new("wss://late.example"));

    let found = session.until("ARCHIVE_FOUND").await;
    let snapshot = session.run_to_stop().await;

    match found {
        Event::ArchiveFound(result) => assert_eq!(result.index, 1),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(snapshot.counters.archive, 1);
}

// =============================================================================
// FAILURE CONTAINMENT
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_node_failures_are_counted_and_run_continues() {
    let directory = MockNodeSource::with_urls([
        "wss://down.example",
        "wss://broken.example",
        "wss://good.example",
    ]);
    let broken = NodeScript {
        height: None,
        ..NodeScript::at_height(0)
    };
    let clients = MockChainClient::new()
        .with_node("wss://down.example", NodeScript::unreachable("refused"))
        .with_node("wss://broken.example", broken)
        .with_node("wss://good.example", NodeScript::at_height(60_000_000));
    let mut session = Session::spawn(directory, clients);
    session.init_with_budget(3).await;
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.errors, 2);
    assert_eq!(snapshot.counters.tested, 1);
    assert_eq!(snapshot.counters.archive, 1);
    assert_eq!(snapshot.index, 3);

    let failures = session.logs(LogLevel::Error);
    assert_eq!(failures.len(), 2);
    assert!(failures[0].contains("Node 0 failed"));
    assert!(failures[0].contains("refused"));
    assert!(failures[1].contains("missing chain height"));
    assert!(session.errors().is_empty());

    // Sessions are closed even when the probe fails.
    assert_eq!(session.clients.closed().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_waits_for_backoff() {
    let urls = numbered_urls(2);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::unreachable("refused")),
    );
    session.init_with_budget(2).await;
    session.controller.start().await.unwrap();
    session.until("STARTED").await;

    let started = Instant::now();
    session.run_to_stop().await;

    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_never_undercuts_pacing_interval() {
    let urls = numbered_urls(2);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::unreachable("refused")),
    );
    session
        .controller
        .init(
            "mock",
            ConfigPatch {
                max_nodes: Some(2),
                probe_interval_ms: Some(1_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    session.controller.start().await.unwrap();
    session.until("STARTED").await;

    let started = Instant::now();
    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.errors, 2);
    assert!(started.elapsed() >= Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_connect_times_out() {
    let mut session = Session::spawn(
        MockNodeSource::with_urls(["wss://stuck.example"]),
        MockChainClient::new().with_node("wss://stuck.example", NodeScript::hanging()),
    );
    session.init_with_budget(1).await;
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.errors, 1);
    assert_eq!(snapshot.counters.tested, 0);
    let failures = session.logs(LogLevel::Error);
    assert!(failures[0].contains("timed out after 100ms"));
}

#[tokio::test(start_paused = true)]
async fn test_source_failure_counts_as_error_and_advances() {
    let urls = numbered_urls(2);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(1_000)),
    );
    session.directory.fail_next_lookups(1);
    session.init_with_budget(2).await;
    session.controller.start().await.unwrap();

    let snapshot = session.run_to_stop().await;

    assert_eq!(snapshot.counters.errors, 1);
    assert_eq!(snapshot.counters.tested, 1);
    assert_eq!(session.clients.created(), vec![urls[1].clone()]);
}

// =============================================================================
// PERIODIC SNAPSHOTS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_state_update_every_tenth_classified_node() {
    // Ten healthy nodes, then a repeat and a dead node, then fifteen more.
    let healthy = numbered_urls(25);
    let mut listing: Vec<String> = healthy[..10].to_vec();
    listing.push(healthy[0].clone());
    listing.push("wss://down.example".to_string());
    listing.extend_from_slice(&healthy[10..]);

    let clients = scripted(&healthy, NodeScript::at_height(1_000));
    clients.script("wss://down.example", NodeScript::unreachable("refused"));
    let mut session = Session::spawn(MockNodeSource::with_urls(listing.clone()), clients);
    session.init_with_budget(listing.len() as u64).await;
    session.controller.start().await.unwrap();

    session.until("STOPPED").await;

    let periodic: Vec<StateSnapshot> = session
        .seen
        .iter()
        .filter_map(|event| match event {
            Event::StateUpdate(snapshot) => Some(snapshot.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(periodic.len(), 2);

    assert_eq!(periodic[0].counters.tested, 10);
    assert_eq!(periodic[0].counters.skipped, 0);
    assert_eq!(periodic[0].counters.errors, 0);
    assert!(periodic[0].running);
    assert_eq!(periodic[0].index, 10);

    assert_eq!(periodic[1].counters.tested, 20);
    assert_eq!(periodic[1].counters.skipped, 1);
    assert_eq!(periodic[1].counters.errors, 1);
    assert_eq!(periodic[1].index, 22);

    let last = session.snapshot_event().await;
    assert_eq!(last.counters.tested, 25);
    assert!(!last.running);
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_node_source_change_reopens_directory() {
    let urls = numbered_urls(1);
    let mut session = Session::spawn(
        MockNodeSource::with_urls(urls.clone()),
        scripted(&urls, NodeScript::at_height(1_000)),
    );
    session.init_with_budget(1).await;
    session.controller.start().await.unwrap();
    session.run_to_stop().await;

    session
        .controller
        .update_config(ConfigPatch {
            node_source_url: Some("mock://replica".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    session.until("CONFIG_UPDATED").await;
    session.controller.start().await.unwrap();
    let snapshot = session.run_to_stop().await;

    assert_eq!(
        session.directory.opened_urls(),
        vec!["mock://directory".to_string(), "mock://replica".to_string()]
    );
    assert_eq!(snapshot.counters.skipped, 1);
    assert_eq!(
        session.controller.config().unwrap().node_source_url,
        "mock://replica"
    );
}

#[tokio::test]
async fn test_invalid_config_is_rejected_and_kept() {
    let mut session = Session::spawn(MockNodeSource::default(), MockChainClient::new());
    session.init_with_budget(7).await;
    session.until("CONFIG_UPDATED").await;

    session
        .controller
        .update_config(ConfigPatch {
            node_source_url: Some(String::new()),
            max_nodes: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    session.until("ERROR").await;

    assert_eq!(session.errors()[0].0, "Configuration rejected");
    assert_eq!(session.controller.config().unwrap().max_nodes, 7);
}

// =============================================================================
// LEDGER INVARIANTS
// =============================================================================

#[derive(Clone, Debug)]
enum Candidate {
    Archive,
    Shallow,
    Pruned,
    Down,
    Repeat,
}

fn candidate() -> impl Strategy<Value = Candidate> {
    prop_oneof![
        Just(Candidate::Archive),
        Just(Candidate::Shallow),
        Just(Candidate::Pruned),
        Just(Candidate::Down),
        Just(Candidate::Repeat),
    ]
}

async fn run_candidates(candidates: &[Candidate]) -> StateSnapshot {
    let directory = MockNodeSource::default();
    let clients = MockChainClient::new();
    for (i, kind) in candidates.iter().enumerate() {
        let url = match kind {
            Candidate::Repeat => "wss://repeat.example".to_string(),
            _ => format!("wss://node-{i}.example"),
        };
        let script = match kind {
            Candidate::Archive | Candidate::Repeat => NodeScript::at_height(60_000_000),
            Candidate::Shallow => NodeScript::at_height(1_000),
            Candidate::Pruned => NodeScript::at_height(60_000_000).missing(59_136_000),
            Candidate::Down => NodeScript::unreachable("refused"),
        };
        clients.script(url.clone(), script);
        directory.push(NodeEndpoint::new(url));
    }

    let mut session = Session::spawn(directory, clients);
    session.init_with_budget(candidates.len() as u64).await;
    session.controller.start().await.unwrap();
    session.run_to_stop().await
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_every_index_is_accounted_once(candidates in prop::collection::vec(candidate(), 1..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        let snapshot = runtime.block_on(run_candidates(&candidates));
        let counters = snapshot.counters;

        prop_assert!(invariants::invariant_counters_balanced(&counters).is_ok());
        prop_assert!(
            invariants::invariant_archive_records(&counters, snapshot.archive_records.len()).is_ok()
        );
        prop_assert_eq!(
            counters.tested + counters.skipped + counters.errors,
            candidates.len() as u64
        );
        prop_assert_eq!(snapshot.index, candidates.len() as u64);
    }
}
