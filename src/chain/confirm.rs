//! Confirmation capability consulted before destructive or irreversible persistence.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Seed,
    Purge,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Seed => write!(f, "seed"),
            Operation::Purge => write!(f, "purge"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub operation: Operation,
    pub entity_type: String,
    pub count: u64,
    pub action: String,
}

impl ConfirmationRequest {
    pub fn prompt(&self) -> String {
        format!("{} {} {} record(s)?", self.action, self.count, self.entity_type)
    }
}

pub trait ConfirmationGate {
    fn confirm(&self, request: &ConfirmationRequest) -> bool;
}

impl<F> ConfirmationGate for F
where
    F: Fn(&ConfirmationRequest) -> bool,
{
    fn confirm(&self, request: &ConfirmationRequest) -> bool {
        self(request)
    }
}

/// Answer decided before the run starts (`--yes`, or non-interactive deny).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetConfirmation(pub bool);

impl PresetConfirmation {
    pub fn approve() -> Self {
        PresetConfirmation(true)
    }

    pub fn deny() -> Self {
        PresetConfirmation(false)
    }
}

impl ConfirmationGate for PresetConfirmation {
    fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        self.0
    }
}
