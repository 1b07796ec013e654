//! End-to-end access-rule lifecycle against a mocked manager.
//!
//! These tests run the real HTTP transport and the full engine path: resolver
//! chain fetch, reference reconciliation, rule create/update/delete.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{any, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spm_core::engine::{EngineConfig, Selector};
use spm_core::http::HttpTransportBuilder;
use spm_core::outcome::{Outcome, Skip};
use spm_core::transport::Transport;
use spm_core::version::ServerVersion;
use spm_objects::{ObjectKind, ResolverChain};
use spm_policy::access::{AccessRule, CollectionAction, RuleAction, RuleField};

fn transport() -> Arc<dyn Transport> {
    Arc::new(
        HttpTransportBuilder::new()
            .with_token("session-token")
            .build()
            .unwrap(),
    )
}

fn config(server: &MockServer) -> EngineConfig {
    EngineConfig::new(server.uri(), ServerVersion::parse("7.2.0").unwrap())
}

const RULES_PATH: &str =
    "/api/policy/v1/domain/global/policy/accesspolicies/policy-1/accessrules";

#[tokio::test]
async fn create_rule_with_resolved_network_and_literal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/policy/v1/domain/global/object/networks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "uuid-net", "name": "Net-A", "type": "Network"}],
            "paging": {"count": 1}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(RULES_PATH))
        .and(body_partial_json(json!({
            "name": "allow-web",
            "action": "ALLOW",
            "sourceNetworks": {
                "objects": [{"name": "Net-A", "id": "uuid-net", "type": "Network"}],
                "literals": {"10.0.0.0/24": "network"}
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "uuid-rule",
            "name": "allow-web",
            "action": "ALLOW"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport();
    let config = config(&server);

    let chain = ResolverChain::fetch(
        &[ObjectKind::Network],
        Arc::clone(&transport),
        &config,
        "global",
    )
    .await
    .unwrap();

    let mut rule = AccessRule::new("global", "policy-1", transport).unwrap();
    rule.set_name("allow-web");
    rule.set_action(RuleAction::Allow);
    rule.reconcile(
        RuleField::SourceNetworks,
        CollectionAction::Add,
        Some("Net-A"),
        None,
        &chain.as_refs(),
    )
    .unwrap();
    rule.reconcile(
        RuleField::SourceNetworks,
        CollectionAction::Add,
        None,
        Some("10.0.0.0/24"),
        &[],
    )
    .unwrap();

    let outcome = rule.post(&config).await.unwrap();
    assert!(outcome.is_performed());
    assert_eq!(rule.instance().id(), Some("uuid-rule"));
}

#[tokio::test]
async fn dry_run_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&server).with_dry_run();
    let mut rule = AccessRule::new("global", "policy-1", transport()).unwrap();
    rule.set_name("allow-web");
    rule.set_action(RuleAction::Allow);

    let outcome = rule.post(&config).await.unwrap();
    assert!(matches!(outcome, Outcome::NotPerformed(Skip::DryRun)));
    assert_eq!(rule.instance().id(), None);
}

#[tokio::test]
async fn update_and_delete_known_rule() {
    let server = MockServer::start().await;
    let rule_path = format!("{RULES_PATH}/uuid-rule");

    Mock::given(method("GET"))
        .and(path(&rule_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "uuid-rule",
            "name": "allow-web",
            "action": "ALLOW",
            "enabled": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(&rule_path))
        .and(body_partial_json(json!({"action": "BLOCK"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "uuid-rule",
            "name": "allow-web",
            "action": "BLOCK"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(&rule_path))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let mut rule = AccessRule::new("global", "policy-1", transport()).unwrap();

    let fetched = rule.get(Selector::Id("uuid-rule"), &config).await.unwrap();
    assert!(fetched.is_performed());
    assert_eq!(rule.instance().id(), Some("uuid-rule"));

    rule.set_action(RuleAction::Block);
    let updated = rule.put(&config).await.unwrap();
    assert!(updated.is_performed());
    assert_eq!(
        rule.instance().field("action"),
        Some(&Value::String("BLOCK".to_string()))
    );

    let deleted = rule.delete(&config).await.unwrap();
    assert!(deleted.is_performed());
}

#[tokio::test]
async fn transport_failure_is_a_skip_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = config(&server);
    let mut rule = AccessRule::new("global", "policy-1", transport()).unwrap();
    rule.set_name("allow-web");
    rule.set_action(RuleAction::Allow);

    let outcome = rule.post(&config).await.unwrap();
    assert!(matches!(
        outcome,
        Outcome::NotPerformed(Skip::Transport(_))
    ));
    assert_eq!(rule.instance().id(), None);
}
