//! Contract Test: Change Detection & Update Decision
//!
//! Constraints verified:
//! - A host with no live address causes no cache mutation and no update
//! - First sight of a host performs exactly one baseline lookup
//! - Equal live/baseline addresses → no update, cache holds the address
//! - Differing addresses → exactly one update with the new address, cache moves
//! - A failing update never stops the pass from reaching the next host

mod common;

use common::*;
use ddns_core::{BaselinePolicy, EngineEvent, ReconcileEngine, UpdateRequest};

fn engine_with(
    interfaces: &ControlledInterfaces,
    resolver: &CountingResolver,
    provider: &RecordingProvider,
    config: &ddns_core::ServiceConfig,
) -> (ReconcileEngine, tokio::sync::mpsc::Receiver<EngineEvent>) {
    ReconcileEngine::new(
        Box::new(interfaces.clone()),
        Box::new(resolver.clone()),
        Box::new(provider.clone()),
        config,
    )
    .expect("engine construction succeeds")
}

fn drain(rx: &mut tokio::sync::mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn matching_baseline_issues_no_update() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::1"));
    let resolver = CountingResolver::new();
    resolver.publish("h1.example.com", ip("2001:db8::1"), "eth0");
    let provider = RecordingProvider::new();

    let (engine, _rx) = engine_with(&interfaces, &resolver, &provider, &config_for(&[("h1", "eth0")]));

    let report = engine.reconcile_once().await;

    assert_eq!(report.unchanged, 1);
    assert_eq!(provider.update_call_count(), 0);
    assert_eq!(resolver.lookups_for("h1.example.com"), 1);
    assert_eq!(engine.cached_address("h1").await, Some(Some(ip("2001:db8::1"))));
}

#[tokio::test]
async fn differing_baseline_issues_exactly_one_update() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::2"));
    let resolver = CountingResolver::new();
    resolver.publish("h1.example.com", ip("2001:db8::1"), "eth0");
    let provider = RecordingProvider::new();

    let (engine, mut rx) =
        engine_with(&interfaces, &resolver, &provider, &config_for(&[("h1", "eth0")]));

    let report = engine.reconcile_once().await;

    assert_eq!(report.updated, 1);
    assert_eq!(
        provider.requests(),
        vec![UpdateRequest::new("example.com", "h1", ip("2001:db8::2"))]
    );
    assert_eq!(engine.cached_address("h1").await, Some(Some(ip("2001:db8::2"))));

    let events = drain(&mut rx);
    assert!(events.contains(&EngineEvent::BaselineSeeded {
        host_name: "h1".to_string(),
        baseline: Some(ip("2001:db8::1")),
    }));
    assert!(events.contains(&EngineEvent::UpdateIssued {
        host_name: "h1".to_string(),
        address: ip("2001:db8::2"),
        previous: Some(ip("2001:db8::1")),
        dry_run: false,
    }));
}

#[tokio::test]
async fn missing_interface_skips_host_without_side_effects() {
    let interfaces = ControlledInterfaces::new();
    let resolver = CountingResolver::new();
    resolver.publish("h1.example.com", ip("2001:db8::1"), "eth0");
    let provider = RecordingProvider::new();

    let (engine, mut rx) =
        engine_with(&interfaces, &resolver, &provider, &config_for(&[("h1", "eth0")]));

    let report = engine.reconcile_once().await;

    assert_eq!(report.skipped, 1);
    assert_eq!(provider.update_call_count(), 0);
    assert_eq!(resolver.total_lookups(), 0);
    assert_eq!(engine.cached_address("h1").await, None);

    let skipped: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|event| matches!(event, EngineEvent::HostSkipped { .. }))
        .collect();
    assert_eq!(skipped.len(), 1);
}

#[tokio::test]
async fn no_global_address_and_enumeration_failure_are_skipped() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set_state("eth0", Live::NoGlobal);
    interfaces.set_state("eth1", Live::Broken);
    let resolver = CountingResolver::new();
    let provider = RecordingProvider::new();

    let (engine, _rx) = engine_with(
        &interfaces,
        &resolver,
        &provider,
        &config_for(&[("h1", "eth0"), ("h2", "eth1")]),
    );

    let report = engine.reconcile_once().await;

    assert_eq!(report.skipped, 2);
    assert_eq!(provider.update_call_count(), 0);
    assert_eq!(engine.cached_address("h1").await, None);
    assert_eq!(engine.cached_address("h2").await, None);
}

#[tokio::test]
async fn unknown_host_seeds_absent_baseline_and_updates() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::1"));
    let resolver = CountingResolver::new();
    let provider = RecordingProvider::new();

    let (engine, _rx) = engine_with(&interfaces, &resolver, &provider, &config_for(&[("h1", "eth0")]));

    let report = engine.reconcile_once().await;

    assert_eq!(report.updated, 1);
    assert_eq!(resolver.lookups_for("h1.example.com"), 1);
    assert_eq!(provider.update_call_count(), 1);
    assert_eq!(engine.cached_address("h1").await, Some(Some(ip("2001:db8::1"))));
}

#[tokio::test]
async fn baseline_lookup_happens_once_per_cache_lifetime() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::1"));
    // Unknown host: the failing lookup still creates the entry
    let resolver = CountingResolver::new();
    let provider = RecordingProvider::new();
    provider.fail_transport_for("h1");

    let (engine, _rx) = engine_with(&interfaces, &resolver, &provider, &config_for(&[("h1", "eth0")]));

    for _ in 0..3 {
        engine.reconcile_once().await;
    }

    assert_eq!(resolver.lookups_for("h1.example.com"), 1);
}

#[tokio::test]
async fn digest_failure_fails_one_host_and_pass_continues() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::2"));
    interfaces.set("eth1", ip("2001:db8::3"));
    let resolver = CountingResolver::new();
    let provider = RecordingProvider::new();
    provider.fail_digest_for("h1");

    let (engine, mut rx) = engine_with(
        &interfaces,
        &resolver,
        &provider,
        &config_for(&[("h1", "eth0"), ("h2", "eth1")]),
    );

    let report = engine.reconcile_once().await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(
        provider.requests(),
        vec![UpdateRequest::new("example.com", "h2", ip("2001:db8::3"))]
    );
    // The failed host keeps its baseline; the next pass re-attempts
    assert_eq!(engine.cached_address("h1").await, Some(None));

    let failure = drain(&mut rx).into_iter().find_map(|event| match event {
        EngineEvent::UpdateFailed { host_name, error, .. } => Some((host_name, error)),
        _ => None,
    });
    let (host_name, error) = failure.expect("an UpdateFailed event");
    assert_eq!(host_name, "h1");
    assert!(error.contains("digest"), "unexpected error: {}", error);
}

#[tokio::test]
async fn transport_failure_self_heals_on_next_pass() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::2"));
    let resolver = CountingResolver::new();
    resolver.publish("h1.example.com", ip("2001:db8::1"), "eth0");
    let provider = RecordingProvider::new();
    provider.fail_transport_for("h1");

    let (engine, _rx) = engine_with(&interfaces, &resolver, &provider, &config_for(&[("h1", "eth0")]));

    let first = engine.reconcile_once().await;
    assert_eq!(first.failed, 1);
    assert_eq!(engine.cached_address("h1").await, Some(Some(ip("2001:db8::1"))));

    provider.heal("h1");
    let second = engine.reconcile_once().await;

    assert_eq!(second.updated, 1);
    assert_eq!(provider.update_call_count(), 1);
    assert_eq!(engine.cached_address("h1").await, Some(Some(ip("2001:db8::2"))));
}

#[tokio::test]
async fn match_interface_policy_ignores_foreign_scopes() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::1"));
    let resolver = CountingResolver::new();
    resolver.publish("h1.example.com", ip("2001:db8::1"), "eth1");
    let provider = RecordingProvider::new();

    let (engine, _rx) = engine_with(&interfaces, &resolver, &provider, &config_for(&[("h1", "eth0")]));

    engine.reconcile_once().await;

    // Answer scoped to another interface is not a baseline → treated as a change
    assert_eq!(provider.update_call_count(), 1);
}

#[tokio::test]
async fn unscoped_answer_is_a_baseline_under_default_policy() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::1"));
    let resolver = CountingResolver::new();
    // Host resolvers report global answers without a scope
    resolver.publish_unscoped("h1.example.com", ip("2001:db8::1").into());
    let provider = RecordingProvider::new();

    let config = config_for(&[("h1", "eth0")]);
    assert_eq!(config.engine.baseline_policy, BaselinePolicy::MatchInterface);

    let (engine, _rx) = engine_with(&interfaces, &resolver, &provider, &config);

    let report = engine.reconcile_once().await;

    assert_eq!(report.unchanged, 1);
    assert_eq!(provider.update_call_count(), 0);
    assert_eq!(engine.cached_address("h1").await, Some(Some(ip("2001:db8::1"))));
}

#[tokio::test]
async fn first_ipv6_policy_accepts_unscoped_answer() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::1"));
    let resolver = CountingResolver::new();
    resolver.publish_unscoped("h1.example.com", "192.0.2.7".parse().unwrap());
    resolver.publish_unscoped("h1.example.com", ip("2001:db8::1").into());
    let provider = RecordingProvider::new();

    let mut config = config_for(&[("h1", "eth0")]);
    config.engine.baseline_policy = BaselinePolicy::FirstIpv6;

    let (engine, _rx) = engine_with(&interfaces, &resolver, &provider, &config);

    let report = engine.reconcile_once().await;

    assert_eq!(report.unchanged, 1);
    assert_eq!(provider.update_call_count(), 0);
}

#[tokio::test]
async fn dry_run_updates_still_move_the_cache() {
    let interfaces = ControlledInterfaces::new();
    interfaces.set("eth0", ip("2001:db8::2"));
    let resolver = CountingResolver::new();
    let provider = RecordingProvider::dry_run();

    let (engine, mut rx) =
        engine_with(&interfaces, &resolver, &provider, &config_for(&[("h1", "eth0")]));

    engine.reconcile_once().await;

    assert_eq!(engine.cached_address("h1").await, Some(Some(ip("2001:db8::2"))));
    assert!(drain(&mut rx).iter().any(|event| matches!(
        event,
        EngineEvent::UpdateIssued { dry_run: true, .. }
    )));
}

#[tokio::test]
async fn invalid_config_is_rejected_at_construction() {
    let result = ReconcileEngine::new(
        Box::new(ControlledInterfaces::new()),
        Box::new(CountingResolver::new()),
        Box::new(RecordingProvider::new()),
        &config_for(&[]),
    );

    assert!(matches!(result, Err(ddns_core::Error::Config(_))));
}
