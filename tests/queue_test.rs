// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Request Queue Integration Tests
 * Check-issued sends observed end to end through the engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{capture_page, MockHost};
use tutka_engine::check::{CheckBuilder, CheckDefinition, CheckMetadata, CheckType, StepAction};
use tutka_engine::events::{EventCollector, ScanEvent};
use tutka_engine::host::HostSdk;
use tutka_engine::registry::CheckRegistry;
use tutka_engine::runner::ScanRunner;
use tutka_engine::types::{ScanConfig, ScanOutcome, Severity};

fn probe_meta(id: &str) -> CheckMetadata {
    CheckMetadata {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        check_type: CheckType::Active,
        tags: Vec::new(),
        severities: vec![Severity::Low],
        aggressivity: None,
        min_aggressivity: None,
        depends_on: Vec::new(),
        skip_if_found_by: None,
    }
}

/// Issues `count` sends, one after another, from a single step.
fn bursty_check(id: &str, count: usize) -> CheckDefinition {
    CheckBuilder::new(probe_meta(id))
        .step("burst", move |_state, ctx| async move {
            for _ in 0..count {
                let spec = ctx.target.request.to_spec();
                ctx.sdk.send(spec).await?;
            }
            Ok(StepAction::done())
        })
        .build()
}

fn runner_with(host: Arc<MockHost>, config: ScanConfig, checks: Vec<CheckDefinition>) -> ScanRunner {
    let mut registry = CheckRegistry::new();
    for check in checks {
        registry.register(check);
    }
    ScanRunner::new(registry, config, host as Arc<dyn HostSdk>).unwrap()
}

#[tokio::test]
async fn serialized_sends_keep_their_spacing() {
    let host = MockHost::new();
    capture_page(&host, "r1", "example.com", "/", &[], "<html></html>");

    let config = ScanConfig {
        concurrent_requests: 1,
        requests_delay_ms: 50,
        ..Default::default()
    };
    let runner = runner_with(Arc::clone(&host), config, vec![bursty_check("bursty", 3)]);

    let outcome = runner.run(vec!["r1".to_string()]).await;
    assert!(matches!(outcome, ScanOutcome::Finished { .. }));

    let sends = host.sends();
    assert_eq!(sends.len(), 3);
    for pair in sends.windows(2) {
        let gap = pair[1].1.duration_since(pair[0].1);
        assert!(
            gap >= Duration::from_millis(45),
            "consecutive sends only {:?} apart",
            gap
        );
    }
}

#[tokio::test]
async fn every_send_is_bracketed_by_queue_events() {
    let host = MockHost::new();
    capture_page(&host, "r1", "example.com", "/", &[], "<html></html>");
    capture_page(&host, "r2", "other.example.com", "/", &[], "<html></html>");

    let runner = runner_with(
        Arc::clone(&host),
        ScanConfig::default(),
        vec![bursty_check("bursty-a", 2), bursty_check("bursty-b", 1)],
    );
    let collector = EventCollector::new(runner.events().clone());
    let handle = collector.start();

    let outcome = runner.run(vec!["r1".to_string(), "r2".to_string()]).await;
    assert!(matches!(outcome, ScanOutcome::Finished { .. }));

    // 2 targets x (2 + 1) sends
    assert_eq!(host.send_count(), 6);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = collector.events().await;
    handle.abort();

    let pending: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::RequestPending {
                pending_request_id, ..
            } => Some(pending_request_id.clone()),
            _ => None,
        })
        .collect();
    let completed: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::RequestCompleted {
                pending_request_id, ..
            } => Some(pending_request_id.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(pending.len(), 6);
    assert_eq!(completed.len(), 6);

    // every pending id completes, and pending always precedes completed
    for id in &completed {
        let pending_pos = events
            .iter()
            .position(|e| matches!(e, ScanEvent::RequestPending { pending_request_id, .. } if pending_request_id == id))
            .unwrap();
        let completed_pos = events
            .iter()
            .position(|e| matches!(e, ScanEvent::RequestCompleted { pending_request_id, .. } if pending_request_id == id))
            .unwrap();
        assert!(pending_pos < completed_pos);
    }
}

#[tokio::test]
async fn transport_failures_fail_only_the_issuing_check() {
    let host = MockHost::new();
    capture_page(&host, "r1", "example.com", "/", &[], "<html></html>");

    let failing = CheckBuilder::new(probe_meta("picky"))
        .step("probe", |_state, ctx| async move {
            let exchange = ctx.sdk.send(ctx.target.request.to_spec()).await?;
            if exchange.response.code() != 418 {
                anyhow::bail!("expected teapot, got {}", exchange.response.code());
            }
            Ok(StepAction::done())
        })
        .build();
    let steady = bursty_check("steady", 1);

    let runner = runner_with(Arc::clone(&host), ScanConfig::default(), vec![failing, steady]);
    let outcome = runner.run(vec!["r1".to_string()]).await;
    assert!(matches!(outcome, ScanOutcome::Finished { .. }));

    let history = runner.execution_history();
    assert_eq!(history.len(), 2);
    let picky = history.iter().find(|r| r.check_id == "picky").unwrap();
    assert!(!picky.is_completed());
    let steady = history.iter().find(|r| r.check_id == "steady").unwrap();
    assert!(steady.is_completed());
}
