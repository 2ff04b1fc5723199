//! End-to-end seeding through the throttle guard, orchestrator and reporter.

use super::test_utils::{
    guarded, lead_template, opportunity_template, orchestrator, row, rows,
};
use proptest::prelude::*;
use recsync::chain::{Constraint, DependencyLink, TargetState};
use recsync::client::{CallKind, InMemoryRecordClient};
use recsync::error::{FailureKind, RemoteError};
use recsync::generator::{EntityTemplate, FieldSource};
use recsync::report::summarize;
use recsync::types::GenerationTarget;
use serde_json::json;

fn acme(entity_type: &str, count: u64) -> GenerationTarget {
    GenerationTarget::new(entity_type, count).with_filter("company", json!("Acme"))
}

#[tokio::test]
async fn empty_scope_gets_exactly_the_target_count() {
    let client = guarded(InMemoryRecordClient::new());
    let mut orchestrator = orchestrator(&client, vec![lead_template()]);

    let result = orchestrator.run(&[acme("Lead", 50)], &[]).await.unwrap();
    let summary = summarize(&result);

    assert_eq!(summary.created_count, 50);
    assert_eq!(summary.skipped_count, 0);
    assert_eq!(summary.failed_count, 0);
    assert_eq!(client.inner().records("Lead").len(), 50);
    assert_eq!(client.inner().call_count(CallKind::Create, "Lead"), 50);
}

#[tokio::test]
async fn surplus_records_leave_the_target_sufficient() {
    let client = guarded(
        InMemoryRecordClient::new().with_records("Lead", rows(60, &[("company", json!("Acme"))])),
    );
    let mut orchestrator = orchestrator(&client, vec![lead_template()]);

    let result = orchestrator.run(&[acme("Lead", 50)], &[]).await.unwrap();
    let summary = summarize(&result);

    assert_eq!(client.inner().call_count(CallKind::Create, "Lead"), 0);
    assert_eq!(summary.per_target[0].state, TargetState::Sufficient);
    assert_eq!(summary.per_target[0].existing_count, 60);
    assert!(summary.all_sufficient());
}

#[tokio::test]
async fn rerun_after_success_creates_nothing() {
    let client = guarded(InMemoryRecordClient::new());
    let targets = vec![acme("Lead", 3), acme("Opportunity", 4)];

    let first = orchestrator(&client, vec![lead_template(), opportunity_template()])
        .run(&targets, &[])
        .await
        .unwrap();
    assert_eq!(first.created.len(), 7);

    let second = orchestrator(&client, vec![lead_template(), opportunity_template()])
        .run(&targets, &[])
        .await
        .unwrap();
    assert!(second.created.is_empty());
    assert!(summarize(&second).all_sufficient());
}

#[tokio::test]
async fn attendance_before_joining_is_skipped_without_a_create() {
    let client = guarded(InMemoryRecordClient::new().with_records(
        "Employee",
        vec![row(&[
            ("name", json!("HR-EMP-0001")),
            ("company", json!("Acme")),
            ("date_of_joining", json!("2025-06-10")),
        ])],
    ));
    let employee = EntityTemplate::new("Employee").carrying("date_of_joining");
    let attendance = EntityTemplate::new("Attendance")
        .with_field("employee", FieldSource::parent_id("Employee"))
        .with_field("attendance_date", FieldSource::fixed("2025-06-01"));
    let links = vec![DependencyLink::new("Employee", "Attendance", "employee")
        .with_constraint(Constraint::date_not_before("date_of_joining", "attendance_date"))];
    let mut orchestrator = orchestrator(&client, vec![employee, attendance]);

    let result = orchestrator
        .run(&[acme("Employee", 1), GenerationTarget::new("Attendance", 1)], &links)
        .await
        .unwrap();
    let summary = summarize(&result);

    assert_eq!(summary.skipped_count, 1);
    assert_eq!(summary.skip_reasons["date precedes parent"], 1);
    assert_eq!(client.inner().call_count(CallKind::Create, "Attendance"), 0);
}

#[tokio::test]
async fn throttled_create_is_retried_and_counted_as_created() {
    let inner = InMemoryRecordClient::new();
    inner.fail_on(
        CallKind::Create,
        "Lead",
        3,
        RemoteError::Throttled {
            status: 429,
            body: Some("Too Many Requests".to_string()),
            attempts: 1,
        },
    );
    let client = guarded(inner);
    let mut orchestrator = orchestrator(&client, vec![lead_template()]);

    let result = orchestrator.run(&[acme("Lead", 3)], &[]).await.unwrap();
    let summary = summarize(&result);

    assert_eq!(summary.created_count, 3);
    assert_eq!(summary.failed_count, 0);
    assert_eq!(client.inner().call_count(CallKind::Create, "Lead"), 4);
}

#[tokio::test]
async fn exhausted_throttle_budget_fails_only_that_unit() {
    let inner = InMemoryRecordClient::new();
    for call in 1..=4 {
        inner.fail_on(
            CallKind::Create,
            "Lead",
            call,
            RemoteError::Throttled {
                status: 429,
                body: None,
                attempts: 1,
            },
        );
    }
    let client = guarded(inner);
    let mut orchestrator = orchestrator(&client, vec![lead_template()]);

    let result = orchestrator.run(&[acme("Lead", 2)], &[]).await.unwrap();
    let summary = summarize(&result);

    assert_eq!(summary.failures_of(FailureKind::Throttled), 1);
    assert_eq!(summary.created_count, 1);
}

#[tokio::test]
async fn child_payload_carries_the_parent_identifier() {
    let client = guarded(InMemoryRecordClient::new());
    let mut orchestrator = orchestrator(&client, vec![lead_template(), opportunity_template()]);

    let result = orchestrator
        .run(&[acme("Lead", 1), acme("Opportunity", 1)], &[])
        .await
        .unwrap();

    let lead = &result.created[0];
    assert_eq!(lead.id, "LEAD-0001");
    assert_ne!(lead.display_name, lead.id);
    let opportunity = &client.inner().records("Opportunity")[0];
    assert_eq!(opportunity["party_name"], json!("LEAD-0001"));
}

#[tokio::test]
async fn repeated_permission_denials_are_flagged() {
    let inner = InMemoryRecordClient::new();
    for call in 1..=3 {
        inner.fail_on(
            CallKind::Create,
            "Lead",
            call,
            RemoteError::Permission {
                status: 403,
                body: "Not permitted".to_string(),
            },
        );
    }
    let client = guarded(inner);
    let mut orchestrator = orchestrator(&client, vec![lead_template()]);

    let result = orchestrator.run(&[acme("Lead", 5)], &[]).await.unwrap();
    let summary = summarize(&result);

    assert_eq!(summary.created_count, 2);
    assert_eq!(summary.failures_of(FailureKind::Permission), 3);
    assert!(summary.systemic_permission_issue);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn parents_are_created_before_children_in_any_declaration_order(
        order in Just(vec!["Lead", "Opportunity", "Task"]).prop_shuffle(),
        lead_count in 1u64..4,
        child_count in 1u64..4,
    ) {
        let task = EntityTemplate::new("Task")
            .with_field("opportunity", FieldSource::parent_id("Opportunity"));
        let targets: Vec<GenerationTarget> = order
            .iter()
            .map(|entity| match *entity {
                "Lead" => GenerationTarget::new("Lead", lead_count),
                other => GenerationTarget::new(other, child_count),
            })
            .collect();
        let client = guarded(InMemoryRecordClient::new());

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime
            .block_on(
                orchestrator(&client, vec![lead_template(), opportunity_template(), task])
                    .run(&targets, &[]),
            )
            .unwrap();

        prop_assert_eq!(result.created.len() as u64, lead_count + 2 * child_count);
        let creates: Vec<String> = client
            .inner()
            .calls()
            .into_iter()
            .filter(|c| c.kind == CallKind::Create)
            .map(|c| c.entity_type)
            .collect();
        let last_lead = creates.iter().rposition(|e| e == "Lead").unwrap();
        let first_opportunity = creates.iter().position(|e| e == "Opportunity").unwrap();
        let last_opportunity = creates.iter().rposition(|e| e == "Opportunity").unwrap();
        let first_task = creates.iter().position(|e| e == "Task").unwrap();
        prop_assert!(last_lead < first_opportunity);
        prop_assert!(last_opportunity < first_task);
    }
}
