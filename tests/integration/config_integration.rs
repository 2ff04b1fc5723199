//! Configuration files drive a full run: targets, links and templates from TOML.

use super::test_utils::{guarded, row};
use recsync::chain::{ChainOrchestrator, PresetConfirmation, TargetState};
use recsync::client::{CallKind, InMemoryRecordClient};
use recsync::config::{ConfigLoader, ValidationError};
use recsync::error::ApiError;
use recsync::generator::{EntityGenerator, RandomSynthesizer};
use recsync::report::summarize;
use recsync::types::parse_date;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const HR_CONFIG: &str = r#"
[connection]
base_url = "https://erp.example.com"
api_key = "key"
api_secret = "secret"
page_size = 200

[scope]
company = "Acme"

[retry]
max_attempts = 2
base_delay_seconds = 0.0
strategy = "fixed"

[throttle]
statuses = [429]

[throttle.policy]
max_attempts = 3
base_delay_seconds = 0.0
strategy = "fixed"

[[targets]]
entity_type = "Attendance"
count = 6
scoped = false

[[targets]]
entity_type = "Employee"
count = 2

[[links]]
parent = "Employee"
child = "Attendance"
child_field = "employee"
constraint = { kind = "date_not_before", parent_field = "date_of_joining", child_field = "attendance_date" }

[[templates]]
entity_type = "Employee"
natural_key = "employee_name"
display_field = "employee_name"
carry_fields = ["date_of_joining"]

[templates.fields]
company = { scope = "company" }
employee_name = { synth = "person_name" }
gender = { synth = "choice", options = ["Female", "Male"] }
date_of_joining = { synth = "date", start = "2025-01-01", end = "2025-06-30" }

[[templates]]
entity_type = "Attendance"
submit = true

[templates.fields]
employee = { parent = "Employee" }
employee_name = { parent = "Employee", field = "employee_name" }
status = { fixed = "Present" }
attendance_date = { synth = "date_after_parent", parent = "Employee", field = "date_of_joining", max_days = 30 }
"#;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recsync.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn full_configuration_loads_and_validates() {
    let (_dir, path) = write_config(HR_CONFIG);
    let config = ConfigLoader::load_from_file(&path).unwrap();

    assert_eq!(config.connection.page_size, 200);
    assert_eq!(config.connection.timeout_secs, 30);
    assert_eq!(config.throttle.statuses, vec![429]);
    assert_eq!(config.templates.len(), 2);
    assert!(config.template("Attendance").unwrap().submit);
    config.validate().unwrap();

    let targets = config.generation_targets();
    assert_eq!(targets[1].scope_filter["company"], json!("Acme"));
    assert!(targets[0].scope_filter.is_empty());
}

#[tokio::test]
async fn configured_chain_seeds_parents_first_and_honours_the_date_constraint() {
    let (_dir, path) = write_config(HR_CONFIG);
    let config = ConfigLoader::load_from_file(&path).unwrap();
    let client = guarded(InMemoryRecordClient::new());
    let generator = EntityGenerator::new(config.scope.scope_values(), config.templates.clone())
        .with_synthesizer(Box::new(RandomSynthesizer::seeded(11)));
    let mut orchestrator =
        ChainOrchestrator::new(&client, generator).with_gate(PresetConfirmation::approve());

    let result = orchestrator
        .run(&config.generation_targets(), &config.dependency_links())
        .await
        .unwrap();
    let summary = summarize(&result);

    assert_eq!(summary.failed_count, 0);
    assert_eq!(summary.skipped_count, 0);
    assert_eq!(result.created_of("Employee").count(), 2);
    assert_eq!(result.created_of("Attendance").count(), 6);
    assert_eq!(result.target("Attendance").unwrap().state, TargetState::Completed);
    assert_eq!(client.inner().call_count(CallKind::Update, "Attendance"), 6);

    let employees = client.inner().records("Employee");
    for attendance in client.inner().records("Attendance") {
        let employee = employees
            .iter()
            .find(|e| e["name"] == attendance["employee"])
            .unwrap();
        let joined = parse_date(&employee["date_of_joining"]).unwrap();
        let attended = parse_date(&attendance["attendance_date"]).unwrap();
        assert!(attended >= joined);
        assert_eq!(attendance["employee_name"], employee["employee_name"]);
        assert_eq!(attendance["docstatus"], json!(1));
    }
}

#[test]
fn cyclic_links_fail_validation() {
    let (_dir, path) = write_config(
        r#"
[connection]
base_url = "https://erp.example.com"
api_key = "key"
api_secret = "secret"

[[targets]]
entity_type = "A"
count = 1
scoped = false

[[targets]]
entity_type = "B"
count = 1
scoped = false

[[links]]
parent = "A"
child = "B"
child_field = "a"

[[links]]
parent = "B"
child = "A"
child_field = "b"

[[templates]]
entity_type = "A"

[[templates]]
entity_type = "B"
"#,
    );
    let config = ConfigLoader::load_from_file(&path).unwrap();
    let errors = config.validate().unwrap_err();
    assert!(errors.iter().any(|e| matches!(e, ValidationError::Plan(_))));
}

#[test]
fn malformed_template_is_a_config_error() {
    let (_dir, path) = write_config(
        r#"
[[templates]]
entity_type = "Lead"

[templates.fields]
lead_name = { synth = "telepathy" }
"#,
    );
    let err = ConfigLoader::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
}

#[tokio::test]
async fn untargeted_parent_is_resolved_within_the_company_scope() {
    let (_dir, path) = write_config(
        r#"
[connection]
base_url = "https://erp.example.com"
api_key = "key"
api_secret = "secret"

[scope]
company = "Acme"

[[targets]]
entity_type = "Attendance"
count = 3

[[links]]
parent = "Employee"
child = "Attendance"
child_field = "employee"

[[templates]]
entity_type = "Attendance"

[templates.fields]
company = { scope = "company" }
status = { fixed = "Present" }
"#,
    );
    let config = ConfigLoader::load_from_file(&path).unwrap();
    config.validate().unwrap();
    let client = guarded(
        InMemoryRecordClient::new()
            .with_records(
                "Employee",
                vec![
                    row(&[("name", json!("HR-EMP-0001")), ("company", json!("Acme"))]),
                    row(&[("name", json!("HR-EMP-0002")), ("company", json!("Globex"))]),
                ],
            ),
    );
    let generator = EntityGenerator::new(config.scope.scope_values(), config.templates.clone());
    let mut orchestrator =
        ChainOrchestrator::new(&client, generator).with_gate(PresetConfirmation::approve());

    let result = orchestrator
        .run(&config.seed_targets(), &config.dependency_links())
        .await
        .unwrap();

    assert_eq!(result.created_of("Attendance").count(), 3);
    assert!(result.skipped.is_empty());
    assert_eq!(result.target("Employee").unwrap().existing_count, 1);
    for attendance in client.inner().records("Attendance") {
        assert_eq!(attendance["employee"], json!("HR-EMP-0001"));
    }
    assert_eq!(client.inner().call_count(CallKind::Create, "Employee"), 0);
}
