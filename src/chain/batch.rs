//! Run outcomes, accumulated monotonically by the orchestrator.

use crate::chain::confirm::Operation;
use crate::error::{FailureKind, RemoteError};
use crate::types::ExternalRecordRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// Nothing to do: the target was already met (or nothing matched a purge)
    Sufficient,
    /// Status only: resolved with a positive delta, nothing attempted
    Pending,
    /// Every unit was attempted
    Completed,
    /// Confirmation was declined before persistence started
    Aborted,
    /// Existing state could not be read
    Unresolved,
}

impl TargetState {
    pub fn label(self) -> &'static str {
        match self {
            TargetState::Sufficient => "sufficient",
            TargetState::Pending => "pending",
            TargetState::Completed => "completed",
            TargetState::Aborted => "aborted",
            TargetState::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub entity_type: String,
    pub operation: Operation,
    pub state: TargetState,
    pub existing_count: u64,
    /// Units to create (seed) or records to remove (purge)
    pub delta: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub entity_type: String,
    pub operation: Operation,
    pub candidate: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub entity_type: String,
    pub operation: Operation,
    pub candidate: String,
    pub kind: FailureKind,
    pub reason: String,
    pub error: String,
}

impl FailedUnit {
    pub fn from_remote(
        entity_type: &str,
        operation: Operation,
        candidate: impl Into<String>,
        reason: impl Into<String>,
        err: &RemoteError,
    ) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            operation,
            candidate: candidate.into(),
            kind: err.kind(),
            reason: reason.into(),
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub created: Vec<ExternalRecordRef>,
    pub deleted: Vec<ExternalRecordRef>,
    pub skipped: Vec<SkippedUnit>,
    pub failed: Vec<FailedUnit>,
    pub targets: Vec<TargetRecord>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self, entity_type: &str) -> Option<&TargetRecord> {
        self.targets.iter().find(|t| t.entity_type == entity_type)
    }

    pub fn created_of(&self, entity_type: &str) -> impl Iterator<Item = &ExternalRecordRef> {
        let entity_type = entity_type.to_string();
        self.created
            .iter()
            .filter(move |r| r.entity_type == entity_type)
    }

    /// No unit failed. Skips do not count.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
