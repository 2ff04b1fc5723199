//! Run Reporter: pure aggregation of a `BatchResult` into counts for presentation.

use crate::chain::{BatchResult, Operation, TargetState};
use crate::error::FailureKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Permission failures at or above this count point at credentials, not records.
pub const SYSTEMIC_PERMISSION_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetBreakdown {
    pub entity_type: String,
    pub operation: Operation,
    pub state: TargetState,
    pub existing_count: u64,
    pub delta: u64,
    pub created: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub created_count: usize,
    pub deleted_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub per_target: Vec<TargetBreakdown>,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    pub skip_reasons: BTreeMap<String, usize>,
    /// Repeated permission denials across units
    pub systemic_permission_issue: bool,
}

impl RunSummary {
    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failures_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// True when the run had nothing left to do at all.
    pub fn all_sufficient(&self) -> bool {
        !self.per_target.is_empty()
            && self
                .per_target
                .iter()
                .all(|t| t.state == TargetState::Sufficient)
    }
}

pub fn summarize(result: &BatchResult) -> RunSummary {
    let per_target = result
        .targets
        .iter()
        .map(|target| {
            let same = |entity_type: &str, operation: Operation| {
                entity_type == target.entity_type && operation == target.operation
            };
            TargetBreakdown {
                entity_type: target.entity_type.clone(),
                operation: target.operation,
                state: target.state,
                existing_count: target.existing_count,
                delta: target.delta,
                created: if target.operation == Operation::Seed {
                    result
                        .created
                        .iter()
                        .filter(|r| r.entity_type == target.entity_type)
                        .count()
                } else {
                    0
                },
                deleted: if target.operation == Operation::Purge {
                    result
                        .deleted
                        .iter()
                        .filter(|r| r.entity_type == target.entity_type)
                        .count()
                } else {
                    0
                },
                skipped: result
                    .skipped
                    .iter()
                    .filter(|s| same(&s.entity_type, s.operation))
                    .count(),
                failed: result
                    .failed
                    .iter()
                    .filter(|f| same(&f.entity_type, f.operation))
                    .count(),
            }
        })
        .collect();

    let mut failures_by_kind = BTreeMap::new();
    for failure in &result.failed {
        *failures_by_kind.entry(failure.kind).or_insert(0) += 1;
    }
    let mut skip_reasons = BTreeMap::new();
    for skipped in &result.skipped {
        *skip_reasons.entry(skipped.reason.clone()).or_insert(0) += 1;
    }
    let permission_failures = failures_by_kind
        .get(&FailureKind::Permission)
        .copied()
        .unwrap_or(0);

    RunSummary {
        created_count: result.created.len(),
        deleted_count: result.deleted.len(),
        skipped_count: result.skipped.len(),
        failed_count: result.failed.len(),
        per_target,
        failures_by_kind,
        skip_reasons,
        systemic_permission_issue: permission_failures >= SYSTEMIC_PERMISSION_THRESHOLD,
    }
}
