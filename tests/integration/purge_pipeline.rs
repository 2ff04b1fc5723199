//! End-to-end purge: children first, cancel before delete, conflicts isolated.

use super::test_utils::{guarded, lead_template, opportunity_template, orchestrator, row};
use recsync::chain::{ConfirmationRequest, TargetState};
use recsync::chain::PresetConfirmation;
use recsync::client::{CallKind, InMemoryRecordClient};
use recsync::error::{FailureKind, RemoteError};
use recsync::report::summarize;
use recsync::types::GenerationTarget;
use serde_json::json;
use std::cell::RefCell;

#[tokio::test]
async fn referenced_record_is_reported_and_the_batch_continues() {
    let client = guarded(
        InMemoryRecordClient::new()
            .with_records(
                "Lead",
                vec![
                    row(&[("name", json!("LEAD-0001"))]),
                    row(&[("name", json!("LEAD-0002"))]),
                    row(&[("name", json!("LEAD-0003"))]),
                ],
            )
            .with_records(
                "Opportunity",
                vec![row(&[("name", json!("OPP-0001")), ("party_name", json!("LEAD-0002"))])],
            ),
    );
    let mut orchestrator =
        orchestrator(&client, vec![lead_template()]).with_gate(PresetConfirmation::approve());

    let result = orchestrator
        .purge(&[GenerationTarget::new("Lead", 0)], &[])
        .await
        .unwrap();
    let summary = summarize(&result);

    assert_eq!(summary.deleted_count, 2);
    assert_eq!(summary.failures_of(FailureKind::Conflict), 1);
    assert_eq!(result.failed[0].candidate, "LEAD-0002");
    assert_eq!(result.failed[0].reason, "has dependencies");
    assert_eq!(client.inner().records("Lead").len(), 1);
}

#[tokio::test]
async fn seeded_chain_purges_cleanly_children_first() {
    let client = guarded(InMemoryRecordClient::new());
    let targets = vec![
        GenerationTarget::new("Lead", 2),
        GenerationTarget::new("Opportunity", 3),
    ];
    orchestrator(&client, vec![lead_template(), opportunity_template()])
        .run(&targets, &[])
        .await
        .unwrap();

    let result = orchestrator(&client, vec![lead_template(), opportunity_template()])
        .with_gate(PresetConfirmation::approve())
        .purge(&targets, &[])
        .await
        .unwrap();

    assert!(result.failed.is_empty());
    assert_eq!(result.deleted.len(), 5);
    assert!(result.deleted[..3].iter().all(|r| r.entity_type == "Opportunity"));
    assert!(client.inner().records("Lead").is_empty());
    assert!(client.inner().records("Opportunity").is_empty());
}

#[tokio::test]
async fn throttled_delete_is_retried() {
    let inner = InMemoryRecordClient::new()
        .with_records("Lead", vec![row(&[("name", json!("LEAD-0001"))])]);
    inner.fail_on(
        CallKind::Delete,
        "Lead",
        1,
        RemoteError::Throttled {
            status: 417,
            body: None,
            attempts: 1,
        },
    );
    let client = guarded(inner);
    let mut orchestrator =
        orchestrator(&client, vec![]).with_gate(PresetConfirmation::approve());

    let result = orchestrator
        .purge(&[GenerationTarget::new("Lead", 0)], &[])
        .await
        .unwrap();

    assert_eq!(result.deleted.len(), 1);
    assert_eq!(client.inner().call_count(CallKind::Delete, "Lead"), 2);
}

#[tokio::test]
async fn each_target_is_confirmed_with_its_count() {
    let client = guarded(
        InMemoryRecordClient::new()
            .with_records("Lead", vec![row(&[]), row(&[])])
            .with_records("Sales Invoice", vec![row(&[("docstatus", json!(1))])]),
    );
    let prompts = RefCell::new(Vec::new());
    let gate = |request: &ConfirmationRequest| {
        prompts.borrow_mut().push(request.prompt());
        request.entity_type == "Sales Invoice"
    };
    let mut orchestrator = orchestrator(&client, vec![]).with_gate(gate);

    let result = orchestrator
        .purge(
            &[
                GenerationTarget::new("Lead", 0),
                GenerationTarget::new("Sales Invoice", 0),
            ],
            &[],
        )
        .await
        .unwrap();

    assert_eq!(
        *prompts.borrow(),
        vec![
            "Delete 1 Sales Invoice record(s)?".to_string(),
            "Delete 2 Lead record(s)?".to_string(),
        ]
    );
    assert_eq!(result.target("Lead").unwrap().state, TargetState::Aborted);
    assert_eq!(
        result.target("Sales Invoice").unwrap().state,
        TargetState::Completed
    );
    assert_eq!(client.inner().call_count(CallKind::Update, "Sales Invoice"), 1);
    assert_eq!(client.inner().records("Lead").len(), 2);
}
