//! Seeding run and read-only status.

use crate::chain::batch::{BatchResult, FailedUnit, SkippedUnit, TargetRecord, TargetState};
use crate::chain::confirm::{ConfirmationRequest, Operation};
use crate::chain::constraint::DependencyLink;
use crate::chain::ChainOrchestrator;
use crate::client::RecordClient;
use crate::error::ApiError;
use crate::generator::{Candidate, ContextRefs};
use crate::resolver::{ExistingStateResolver, Projection};
use crate::types::{DocStatus, ExternalRecordRef, Fields, GenerationTarget};
use serde_json::Value;
use tracing::{debug, info, warn};

impl<'a, C: RecordClient + ?Sized> ChainOrchestrator<'a, C> {
    /// Bring every target up to its count, parents before children.
    pub async fn run(
        &mut self,
        targets: &[GenerationTarget],
        links: &[DependencyLink],
    ) -> Result<BatchResult, ApiError> {
        let (targets, order) = self.seed_plan(targets, links)?;
        let mut context = ContextRefs::new();
        let mut result = BatchResult::new();

        info!(targets = targets.len(), links = links.len(), "Seed run started");
        for index in order {
            self.seed_target(&targets[index], links, &mut context, &mut result)
                .await;
        }
        info!(
            created = result.created.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            "Seed run finished"
        );
        Ok(result)
    }

    /// Resolve every target without creating anything.
    pub async fn status(
        &mut self,
        targets: &[GenerationTarget],
        links: &[DependencyLink],
    ) -> Result<BatchResult, ApiError> {
        let (targets, order) = self.seed_plan(targets, links)?;
        let mut result = BatchResult::new();
        for index in order {
            let target = &targets[index];
            let projection = self.generator.projection(&target.entity_type);
            let record = match ExistingStateResolver::new(self.client)
                .resolve(target, &projection)
                .await
            {
                Ok(resolution) => TargetRecord {
                    entity_type: target.entity_type.clone(),
                    operation: Operation::Seed,
                    state: if resolution.is_sufficient() {
                        TargetState::Sufficient
                    } else {
                        TargetState::Pending
                    },
                    existing_count: resolution.existing_count,
                    delta: resolution.delta,
                },
                Err(err) => {
                    result.failed.push(FailedUnit::from_remote(
                        &target.entity_type,
                        Operation::Seed,
                        "existing records",
                        "resolve failed",
                        &err,
                    ));
                    unresolved(target, Operation::Seed)
                }
            };
            result.targets.push(record);
        }
        Ok(result)
    }

    async fn seed_target(
        &mut self,
        target: &GenerationTarget,
        links: &[DependencyLink],
        context: &mut ContextRefs,
        result: &mut BatchResult,
    ) {
        let entity_type = target.entity_type.as_str();
        let projection = self.generator.projection(entity_type);

        // Resolve
        let resolution = match ExistingStateResolver::new(self.client)
            .resolve(target, &projection)
            .await
        {
            Ok(resolution) => resolution,
            Err(err) => {
                warn!(entity_type, error = %err, "Could not resolve existing records");
                result.failed.push(FailedUnit::from_remote(
                    entity_type,
                    Operation::Seed,
                    "existing records",
                    "resolve failed",
                    &err,
                ));
                result.targets.push(unresolved(target, Operation::Seed));
                return;
            }
        };
        self.generator
            .register_existing(entity_type, &resolution.existing_records);
        context
            .entry(entity_type.to_string())
            .or_default()
            .extend(resolution.existing_records.iter().cloned());

        let mut record = TargetRecord {
            entity_type: entity_type.to_string(),
            operation: Operation::Seed,
            state: TargetState::Sufficient,
            existing_count: resolution.existing_count,
            delta: resolution.delta,
        };
        if resolution.is_sufficient() {
            info!(
                entity_type,
                existing = resolution.existing_count,
                target = target.target_count,
                "Target already sufficient"
            );
            result.targets.push(record);
            return;
        }

        let (submit, label_field) = self
            .generator
            .template(entity_type)
            .map(|t| {
                (
                    t.submit,
                    t.natural_key.clone().or_else(|| t.display_field.clone()),
                )
            })
            .unwrap_or((false, None));

        if submit {
            let request = ConfirmationRequest {
                operation: Operation::Seed,
                entity_type: entity_type.to_string(),
                count: resolution.delta,
                action: "Create and submit".to_string(),
            };
            if !self.gate.confirm(&request) {
                info!(entity_type, "Submission declined; target aborted");
                record.state = TargetState::Aborted;
                result.targets.push(record);
                return;
            }
        }

        info!(entity_type, delta = resolution.delta, "Generating records");
        for unit in 0..resolution.delta {
            // Generate
            let candidate = match self.generator.generate(entity_type, context) {
                Ok(candidate) => candidate,
                Err(err) => {
                    debug!(entity_type, unit, reason = %err, "Unit skipped");
                    result.skipped.push(SkippedUnit {
                        entity_type: entity_type.to_string(),
                        operation: Operation::Seed,
                        candidate: format!("{} #{}", entity_type, unit + 1),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            let label = candidate.label(label_field.as_deref());

            // Constrain
            if let Some(reason) = violated_constraint(links, &candidate) {
                debug!(entity_type, unit, candidate = %label, reason, "Unit skipped");
                result.skipped.push(SkippedUnit {
                    entity_type: entity_type.to_string(),
                    operation: Operation::Seed,
                    candidate: label,
                    reason: reason.to_string(),
                });
                continue;
            }

            // Persist
            let created = match self.client.create(entity_type, candidate.payload.clone()).await {
                Ok(created) => carried_ref(created, &candidate.payload, &projection),
                Err(err) => {
                    warn!(entity_type, unit, candidate = %label, error = %err, "Create failed");
                    result.failed.push(FailedUnit::from_remote(
                        entity_type,
                        Operation::Seed,
                        label,
                        err.kind().label(),
                        &err,
                    ));
                    continue;
                }
            };
            debug!(entity_type, unit, id = %created.id, "Record created");

            if submit {
                if let Err(err) = self
                    .client
                    .update(entity_type, &created.id, DocStatus::Submitted.as_patch())
                    .await
                {
                    warn!(entity_type, id = %created.id, error = %err, "Submit failed");
                    result.failed.push(FailedUnit::from_remote(
                        entity_type,
                        Operation::Seed,
                        created.id.clone(),
                        "submit failed",
                        &err,
                    ));
                }
            }

            // Advance: visible to later units and to children
            context
                .entry(entity_type.to_string())
                .or_default()
                .push(created.clone());
            result.created.push(created);
        }
        record.state = TargetState::Completed;
        result.targets.push(record);
    }
}

fn unresolved(target: &GenerationTarget, operation: Operation) -> TargetRecord {
    TargetRecord {
        entity_type: target.entity_type.clone(),
        operation,
        state: TargetState::Unresolved,
        existing_count: 0,
        delta: 0,
    }
}

/// Reason of the first link constraint the candidate violates against its chosen parent.
fn violated_constraint(links: &[DependencyLink], candidate: &Candidate) -> Option<&'static str> {
    links
        .iter()
        .filter(|link| link.child_type == candidate.entity_type)
        .find_map(|link| {
            let constraint = link.constraint.as_ref()?;
            let parent = candidate.parents.get(&link.parent_type)?;
            (!constraint.check(parent, &candidate.payload)).then(|| constraint.violation_reason())
        })
}

/// Keep only projected fields on a created ref, falling back to the submitted payload.
fn carried_ref(
    created: ExternalRecordRef,
    payload: &Fields,
    projection: &Projection,
) -> ExternalRecordRef {
    let mut out = ExternalRecordRef::new(created.entity_type.clone(), created.id.clone());
    for field in projection.fields.iter().filter(|f| f.as_str() != "name") {
        if let Some(value) = created.fields.get(field).or_else(|| payload.get(field)) {
            out.fields.insert(field.clone(), value.clone());
        }
    }
    let display = projection
        .display_field
        .as_deref()
        .and_then(|field| out.fields.get(field))
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(display) = display {
        out.display_name = display;
    }
    out
}
