//! Bulk purge: children before parents, submitted records cancelled before deletion.

use crate::chain::batch::{BatchResult, FailedUnit, SkippedUnit, TargetRecord, TargetState};
use crate::chain::confirm::{ConfirmationRequest, Operation};
use crate::chain::constraint::DependencyLink;
use crate::chain::plan::dependency_order;
use crate::chain::ChainOrchestrator;
use crate::client::RecordClient;
use crate::error::{ApiError, RemoteError};
use crate::resolver::Projection;
use crate::types::{DocStatus, ExternalRecordRef, GenerationTarget};
use tracing::{debug, info, warn};

impl<'a, C: RecordClient + ?Sized> ChainOrchestrator<'a, C> {
    /// Delete every record matching each target's scope, in reverse dependency order.
    /// Each target is confirmed through the gate first; a declined target is aborted.
    pub async fn purge(
        &mut self,
        targets: &[GenerationTarget],
        links: &[DependencyLink],
    ) -> Result<BatchResult, ApiError> {
        let edges = self.edges(targets, links);
        let order = dependency_order(targets, &edges)?;
        let mut result = BatchResult::new();

        info!(targets = targets.len(), "Purge started");
        for index in order.into_iter().rev() {
            self.purge_target(&targets[index], &mut result).await;
        }
        info!(
            deleted = result.deleted.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            "Purge finished"
        );
        Ok(result)
    }

    async fn purge_target(&mut self, target: &GenerationTarget, result: &mut BatchResult) {
        let entity_type = target.entity_type.as_str();
        let display_field = self
            .generator
            .template(entity_type)
            .and_then(|t| t.display_field.clone());
        let projection = Projection::new([DocStatus::FIELD.to_string()], display_field);

        let records: Vec<ExternalRecordRef> = match self
            .client
            .list(entity_type, &target.scope_filter, &projection.fields)
            .await
        {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| projection.to_ref(entity_type, row))
                .collect(),
            Err(err) => {
                warn!(entity_type, error = %err, "Could not list records to purge");
                result.failed.push(FailedUnit::from_remote(
                    entity_type,
                    Operation::Purge,
                    "existing records",
                    "list failed",
                    &err,
                ));
                result.targets.push(TargetRecord {
                    entity_type: entity_type.to_string(),
                    operation: Operation::Purge,
                    state: TargetState::Unresolved,
                    existing_count: 0,
                    delta: 0,
                });
                return;
            }
        };

        let count = records.len() as u64;
        let mut record = TargetRecord {
            entity_type: entity_type.to_string(),
            operation: Operation::Purge,
            state: TargetState::Sufficient,
            existing_count: count,
            delta: count,
        };
        if records.is_empty() {
            info!(entity_type, "Nothing to purge");
            result.targets.push(record);
            return;
        }

        let request = ConfirmationRequest {
            operation: Operation::Purge,
            entity_type: entity_type.to_string(),
            count,
            action: "Delete".to_string(),
        };
        if !self.gate.confirm(&request) {
            info!(entity_type, "Purge declined; target aborted");
            record.state = TargetState::Aborted;
            result.targets.push(record);
            return;
        }

        for existing in records {
            if DocStatus::of(&existing.fields) == DocStatus::Submitted {
                if let Err(err) = self
                    .client
                    .update(entity_type, &existing.id, DocStatus::Cancelled.as_patch())
                    .await
                {
                    warn!(entity_type, id = %existing.id, error = %err, "Cancel failed");
                    result.failed.push(FailedUnit::from_remote(
                        entity_type,
                        Operation::Purge,
                        existing.id.clone(),
                        "cancel failed",
                        &err,
                    ));
                    continue;
                }
            }

            match self.client.delete(entity_type, &existing.id).await {
                Ok(()) => {
                    debug!(entity_type, id = %existing.id, "Record deleted");
                    result.deleted.push(existing);
                }
                Err(err) if err.is_not_found() => {
                    result.skipped.push(SkippedUnit {
                        entity_type: entity_type.to_string(),
                        operation: Operation::Purge,
                        candidate: existing.id,
                        reason: "already deleted".to_string(),
                    });
                }
                Err(err) => {
                    let reason = match err {
                        RemoteError::Conflict { .. } => "has dependencies",
                        _ => err.kind().label(),
                    };
                    warn!(entity_type, id = %existing.id, error = %err, reason, "Delete failed");
                    result.failed.push(FailedUnit::from_remote(
                        entity_type,
                        Operation::Purge,
                        existing.id,
                        reason,
                        &err,
                    ));
                }
            }
        }
        record.state = TargetState::Completed;
        result.targets.push(record);
    }
}
