//! Recsync: Idempotent Record Seeding
//!
//! Brings sets of related records on a remote record-management API up to
//! target counts. Existing records are counted first, only the delta is
//! generated, parents are created before the children that reference them,
//! and every unit's outcome is reported without aborting the run.

pub mod chain;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod report;
pub mod resolver;
pub mod types;

pub use chain::{BatchResult, ChainOrchestrator, ConfirmationGate, PresetConfirmation};
pub use client::{HttpRecordClient, InMemoryRecordClient, RecordClient, ThrottleGuard};
pub use config::{ConfigLoader, RecsyncConfig};
pub use error::{ApiError, FailureKind, RemoteError};
pub use generator::{EntityGenerator, EntityTemplate};
pub use report::{summarize, RunSummary};
pub use types::{ExternalRecordRef, GenerationTarget, RetryPolicy};
