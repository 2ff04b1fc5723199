//! In-memory record client.
//!
//! Behaves like the remote for the engine's purposes: equality filters, field
//! projection, generated identifiers (`LEAD-0001`), docstatus handling, link
//! conflicts on delete. Failures can be scripted per call for tests.

use crate::client::RecordClient;
use crate::error::RemoteError;
use crate::types::{DocStatus, ExternalRecordRef, Fields, Record};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// One observed call, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub kind: CallKind,
    pub entity_type: String,
    pub id: Option<String>,
    pub payload: Option<Fields>,
}

#[derive(Debug, Clone)]
struct ScriptedFailure {
    kind: CallKind,
    entity_type: String,
    on_call: usize,
    error: RemoteError,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Vec<Record>>,
    sequences: HashMap<String, u64>,
    counters: HashMap<(CallKind, String), usize>,
    failures: Vec<ScriptedFailure>,
    calls: Vec<CallRecord>,
}

impl State {
    /// Count the call and return a scripted failure if one targets it.
    fn observe(
        &mut self,
        kind: CallKind,
        entity_type: &str,
        id: Option<&str>,
        payload: Option<&Fields>,
    ) -> Result<(), RemoteError> {
        self.calls.push(CallRecord {
            kind,
            entity_type: entity_type.to_string(),
            id: id.map(str::to_string),
            payload: payload.cloned(),
        });
        let counter = self
            .counters
            .entry((kind, entity_type.to_string()))
            .or_insert(0);
        *counter += 1;
        let call_number = *counter;
        match self.failures.iter().position(|f| {
            f.kind == kind && f.entity_type == entity_type && f.on_call == call_number
        }) {
            Some(index) => Err(self.failures.remove(index).error),
            None => Ok(()),
        }
    }

    fn next_id(&mut self, entity_type: &str) -> String {
        let seq = self.sequences.entry(entity_type.to_string()).or_insert(0);
        *seq += 1;
        format!("{}-{:04}", id_prefix(entity_type), seq)
    }

    fn find(&self, entity_type: &str, id: &str) -> Option<(usize, &Record)> {
        self.tables.get(entity_type)?.iter().enumerate().find(|(_, r)| {
            r.get("name").and_then(Value::as_str) == Some(id)
        })
    }

    /// First record elsewhere that references `id` through a link field.
    fn referrer(&self, entity_type: &str, id: &str) -> Option<(String, String)> {
        self.tables.iter().find_map(|(other_type, rows)| {
            rows.iter().find_map(|row| {
                let row_id = row.get("name").and_then(Value::as_str)?;
                if other_type == entity_type && row_id == id {
                    return None;
                }
                let links_here = row
                    .iter()
                    .any(|(key, value)| key != "name" && value.as_str() == Some(id));
                links_here.then(|| (other_type.clone(), row_id.to_string()))
            })
        })
    }
}

fn id_prefix(entity_type: &str) -> String {
    entity_type
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_uppercase()
}

fn matches_filter(record: &Record, filter: &Fields) -> bool {
    filter
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

fn project(record: &Record, fields: &[String]) -> Record {
    if fields.is_empty() || fields.iter().any(|f| f == "*") {
        return record.clone();
    }
    let mut out = Record::new();
    if let Some(name) = record.get("name") {
        out.insert("name".to_string(), name.clone());
    }
    for field in fields {
        if let Some(value) = record.get(field) {
            out.insert(field.clone(), value.clone());
        }
    }
    out
}

fn to_ref(entity_type: &str, record: &Record) -> ExternalRecordRef {
    let id = record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let mut fields = record.clone();
    fields.remove("name");
    let mut out = ExternalRecordRef::new(entity_type, id);
    out.fields = fields;
    out
}

/// In-memory stand-in for the remote record API
#[derive(Debug, Default)]
pub struct InMemoryRecordClient {
    state: Mutex<State>,
}

impl InMemoryRecordClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed pre-existing records. Records without a `name` get a generated one.
    pub fn with_records(self, entity_type: &str, records: Vec<Record>) -> Self {
        {
            let mut state = self.state.lock();
            for mut record in records {
                if !record.contains_key("name") {
                    let id = state.next_id(entity_type);
                    record.insert("name".to_string(), Value::String(id));
                }
                state
                    .tables
                    .entry(entity_type.to_string())
                    .or_default()
                    .push(record);
            }
        }
        self
    }

    /// Fail the `on_call`-th (1-based) call of `kind` against `entity_type`.
    pub fn fail_on(&self, kind: CallKind, entity_type: &str, on_call: usize, error: RemoteError) {
        self.state.lock().failures.push(ScriptedFailure {
            kind,
            entity_type: entity_type.to_string(),
            on_call,
            error,
        });
    }

    pub fn records(&self, entity_type: &str) -> Vec<Record> {
        self.state
            .lock()
            .tables
            .get(entity_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, kind: CallKind, entity_type: &str) -> usize {
        self.state
            .lock()
            .counters
            .get(&(kind, entity_type.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordClient for InMemoryRecordClient {
    async fn list(
        &self,
        entity_type: &str,
        filter: &Fields,
        fields: &[String],
    ) -> Result<Vec<Record>, RemoteError> {
        let mut state = self.state.lock();
        state.observe(CallKind::List, entity_type, None, None)?;
        Ok(state
            .tables
            .get(entity_type)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches_filter(r, filter))
                    .map(|r| project(r, fields))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, entity_type: &str, id: &str) -> Result<Record, RemoteError> {
        let mut state = self.state.lock();
        state.observe(CallKind::Get, entity_type, Some(id), None)?;
        state
            .find(entity_type, id)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| RemoteError::NotFound {
                body: format!("{} {} not found", entity_type, id),
            })
    }

    async fn create(
        &self,
        entity_type: &str,
        payload: Fields,
    ) -> Result<ExternalRecordRef, RemoteError> {
        let mut state = self.state.lock();
        state.observe(CallKind::Create, entity_type, None, Some(&payload))?;
        let id = state.next_id(entity_type);
        let mut record = payload;
        record.insert("name".to_string(), Value::String(id));
        record
            .entry(DocStatus::FIELD.to_string())
            .or_insert_with(|| Value::from(DocStatus::Draft.code()));
        let created = to_ref(entity_type, &record);
        state
            .tables
            .entry(entity_type.to_string())
            .or_default()
            .push(record);
        Ok(created)
    }

    async fn update(
        &self,
        entity_type: &str,
        id: &str,
        partial: Fields,
    ) -> Result<ExternalRecordRef, RemoteError> {
        let mut state = self.state.lock();
        state.observe(CallKind::Update, entity_type, Some(id), Some(&partial))?;
        let index = state
            .find(entity_type, id)
            .map(|(index, _)| index)
            .ok_or_else(|| RemoteError::NotFound {
                body: format!("{} {} not found", entity_type, id),
            })?;
        let rows = state.tables.get_mut(entity_type).ok_or_else(|| {
            RemoteError::NotFound {
                body: format!("{} {} not found", entity_type, id),
            }
        })?;
        let record = &mut rows[index];
        for (field, value) in partial {
            if field != "name" {
                record.insert(field, value);
            }
        }
        Ok(to_ref(entity_type, record))
    }

    async fn delete(&self, entity_type: &str, id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.observe(CallKind::Delete, entity_type, Some(id), None)?;
        let (index, record) = state.find(entity_type, id).ok_or_else(|| RemoteError::NotFound {
            body: format!("{} {} not found", entity_type, id),
        })?;
        if DocStatus::of(record) == DocStatus::Submitted {
            return Err(RemoteError::Validation {
                status: 400,
                body: format!("Submitted {} {} cannot be deleted; cancel it first", entity_type, id),
            });
        }
        if let Some((other_type, other_id)) = state.referrer(entity_type, id) {
            return Err(RemoteError::Conflict {
                body: format!(
                    "Cannot delete {} {} because it is linked with {} {}",
                    entity_type, id, other_type, other_id
                ),
            });
        }
        if let Some(rows) = state.tables.get_mut(entity_type) {
            rows.remove(index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_assigns_prefixed_sequential_ids() {
        let client = InMemoryRecordClient::new();
        let first = client
            .create("Lead", fields(&[("lead_name", json!("Ada"))]))
            .await
            .unwrap();
        let second = client
            .create("Salary Slip", Fields::new())
            .await
            .unwrap();
        assert_eq!(first.id, "LEAD-0001");
        assert_eq!(second.id, "SALARY-SLIP-0001");
        assert_eq!(first.fields.get("docstatus"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn list_filters_and_projects() {
        let client = InMemoryRecordClient::new().with_records(
            "Employee",
            vec![
                fields(&[("company", json!("Acme")), ("status", json!("Active"))]),
                fields(&[("company", json!("Other")), ("status", json!("Active"))]),
            ],
        );
        let filter = fields(&[("company", json!("Acme"))]);
        let rows = client
            .list("Employee", &filter, &["company".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&json!("EMPLOYEE-0001")));
        assert!(rows[0].get("status").is_none());
    }

    #[tokio::test]
    async fn delete_refuses_linked_and_submitted_records() {
        let client = InMemoryRecordClient::new()
            .with_records("Employee", vec![fields(&[("name", json!("EMP-1"))])])
            .with_records(
                "Attendance",
                vec![fields(&[
                    ("employee", json!("EMP-1")),
                    ("docstatus", json!(1)),
                ])],
            );

        let err = client.delete("Employee", "EMP-1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Conflict { .. }));

        let err = client
            .delete("Attendance", "ATTENDANCE-0001")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Validation { .. }));

        client
            .update("Attendance", "ATTENDANCE-0001", DocStatus::Cancelled.as_patch())
            .await
            .unwrap();
        client.delete("Attendance", "ATTENDANCE-0001").await.unwrap();
        client.delete("Employee", "EMP-1").await.unwrap();
        assert!(client.records("Employee").is_empty());
    }

    #[tokio::test]
    async fn scripted_failures_fire_once_on_the_chosen_call() {
        let client = InMemoryRecordClient::new();
        client.fail_on(
            CallKind::Create,
            "Lead",
            2,
            RemoteError::Validation {
                status: 400,
                body: "bad".into(),
            },
        );
        assert!(client.create("Lead", Fields::new()).await.is_ok());
        assert!(client.create("Lead", Fields::new()).await.is_err());
        assert!(client.create("Lead", Fields::new()).await.is_ok());
        assert_eq!(client.records("Lead").len(), 2);
        assert_eq!(client.calls().len(), 3);
    }
}
