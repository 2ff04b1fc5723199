//! Shared fixtures for integration tests

use recsync::chain::ChainOrchestrator;
use recsync::client::{InMemoryRecordClient, ThrottleGuard};
use recsync::generator::{EntityGenerator, EntityTemplate, FieldSource, RandomSynthesizer, SynthSpec};
use recsync::types::{Fields, Record, RetryPolicy};
use serde_json::{json, Value};

pub type GuardedClient = ThrottleGuard<InMemoryRecordClient>;

/// In-memory remote behind a throttle guard that retries without sleeping.
pub fn guarded(client: InMemoryRecordClient) -> GuardedClient {
    ThrottleGuard::new(client, RetryPolicy::immediate(4))
}

pub fn scope() -> Fields {
    let mut scope = Fields::new();
    scope.insert("company".to_string(), json!("Acme"));
    scope
}

pub fn generator(templates: Vec<EntityTemplate>) -> EntityGenerator {
    EntityGenerator::new(scope(), templates).with_synthesizer(Box::new(RandomSynthesizer::seeded(7)))
}

pub fn orchestrator<'a>(
    client: &'a GuardedClient,
    templates: Vec<EntityTemplate>,
) -> ChainOrchestrator<'a, GuardedClient> {
    ChainOrchestrator::new(client, generator(templates))
}

pub fn lead_template() -> EntityTemplate {
    EntityTemplate::new("Lead")
        .with_natural_key("lead_name")
        .with_display_field("lead_name")
        .with_field("lead_name", FieldSource::Synth(SynthSpec::PersonName))
        .with_field("company", FieldSource::scope("company"))
}

pub fn opportunity_template() -> EntityTemplate {
    EntityTemplate::new("Opportunity")
        .with_field("opportunity_from", FieldSource::fixed("Lead"))
        .with_field("party_name", FieldSource::parent_id("Lead"))
        .with_field("company", FieldSource::scope("company"))
}

pub fn row(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn rows(count: usize, pairs: &[(&str, Value)]) -> Vec<Record> {
    (0..count).map(|_| row(pairs)).collect()
}
