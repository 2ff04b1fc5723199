//! Existing-state resolver: how many records of a target already exist, and how
//! many more are needed. A pure function of remote state.

use crate::client::RecordClient;
use crate::error::RemoteError;
use crate::types::{ExternalRecordRef, GenerationTarget, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Fields requested when listing existing records, and which one names them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub fields: Vec<String>,
    pub display_field: Option<String>,
}

impl Projection {
    pub fn new(fields: impl IntoIterator<Item = String>, display_field: Option<String>) -> Self {
        let mut out = vec!["name".to_string()];
        for field in fields.into_iter().chain(display_field.clone()) {
            if !out.contains(&field) {
                out.push(field);
            }
        }
        Self {
            fields: out,
            display_field,
        }
    }

    /// Turn a listed row into a record ref holding only the projected fields.
    pub fn to_ref(&self, entity_type: &str, row: &Record) -> Option<ExternalRecordRef> {
        let id = row.get("name").and_then(Value::as_str)?;
        if id.is_empty() {
            return None;
        }
        let mut record = ExternalRecordRef::new(entity_type, id);
        if let Some(display) = self
            .display_field
            .as_deref()
            .and_then(|f| row.get(f))
            .and_then(Value::as_str)
        {
            record.display_name = display.to_string();
        }
        for field in self.fields.iter().filter(|f| f.as_str() != "name") {
            if let Some(value) = row.get(field) {
                record.fields.insert(field.clone(), value.clone());
            }
        }
        Some(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub existing_count: u64,
    pub delta: u64,
    pub existing_records: Vec<ExternalRecordRef>,
}

impl Resolution {
    pub fn is_sufficient(&self) -> bool {
        self.delta == 0
    }
}

/// `max(0, target - existing)`
pub fn compute_delta(existing_count: u64, target_count: u64) -> u64 {
    target_count.saturating_sub(existing_count)
}

pub struct ExistingStateResolver<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C: RecordClient + ?Sized> ExistingStateResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub async fn resolve(
        &self,
        target: &GenerationTarget,
        projection: &Projection,
    ) -> Result<Resolution, RemoteError> {
        let rows = self
            .client
            .list(&target.entity_type, &target.scope_filter, &projection.fields)
            .await?;
        let existing_count = rows.len() as u64;
        let delta = compute_delta(existing_count, target.target_count);
        let existing_records = rows
            .iter()
            .filter_map(|row| projection.to_ref(&target.entity_type, row))
            .collect();
        debug!(
            entity_type = %target.entity_type,
            existing_count,
            target_count = target.target_count,
            delta,
            "Resolved existing state"
        );
        Ok(Resolution {
            existing_count,
            delta,
            existing_records,
        })
    }
}
