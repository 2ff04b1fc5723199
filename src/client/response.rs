//! Response normalization: the one place that knows the shapes the remote answers with.
//! Nothing above the client branches on response shape.

use crate::error::RemoteError;
use crate::types::{ExternalRecordRef, Record};
use serde_json::Value;

/// Parse a success body. Empty or non-JSON bodies (common on delete) become `Null`.
pub fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or(Value::Null)
}

/// Locate the record document inside a response envelope.
/// Accepted shapes: `{name, ...}`, `{data: {name, ...}}`, `{message: {name, ...}}`.
fn document(body: &Value) -> Option<&Record> {
    let top = body.as_object()?;
    if top.get("name").map_or(false, Value::is_string) {
        return Some(top);
    }
    ["data", "message"]
        .iter()
        .filter_map(|key| top.get(*key).and_then(Value::as_object))
        .find(|doc| doc.get("name").map_or(false, Value::is_string))
}

/// Normalize a create/update/get response into the canonical record document.
pub fn extract_document(entity_type: &str, body: &Value) -> Result<Record, RemoteError> {
    document(body).cloned().ok_or_else(|| {
        RemoteError::Decode(format!(
            "No record identifier in {} response (expected name, data.name or message.name)",
            entity_type
        ))
    })
}

/// Normalize a create/update response into an `ExternalRecordRef`.
pub fn normalize_record(entity_type: &str, body: &Value) -> Result<ExternalRecordRef, RemoteError> {
    let mut doc = extract_document(entity_type, body)?;
    let id = match doc.remove("name") {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        _ => {
            return Err(RemoteError::Decode(format!(
                "Empty record identifier in {} response",
                entity_type
            )))
        }
    };
    let mut record = ExternalRecordRef::new(entity_type, id);
    record.fields = doc;
    Ok(record)
}

/// Normalize a list response into rows. Accepts `{data: [...]}`, `{message: [...]}` or a bare array.
pub fn extract_rows(entity_type: &str, body: &Value) -> Result<Vec<Record>, RemoteError> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(top) => ["data", "message"]
            .iter()
            .find_map(|key| top.get(*key).and_then(Value::as_array))
            .ok_or_else(|| {
                RemoteError::Decode(format!("List response for {} has no rows", entity_type))
            })?,
        _ => {
            return Err(RemoteError::Decode(format!(
                "List response for {} is not JSON",
                entity_type
            )))
        }
    };
    rows.iter()
        .map(|row| {
            row.as_object().cloned().ok_or_else(|| {
                RemoteError::Decode(format!("List row for {} is not an object", entity_type))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifier_is_found_in_every_envelope() {
        let shapes = [
            json!({"name": "LEAD-0001", "status": "Open"}),
            json!({"data": {"name": "LEAD-0001", "status": "Open"}}),
            json!({"message": {"name": "LEAD-0001", "status": "Open"}}),
        ];
        for body in shapes {
            let record = normalize_record("Lead", &body).unwrap();
            assert_eq!(record.id, "LEAD-0001");
            assert_eq!(record.entity_type, "Lead");
            assert_eq!(record.fields.get("status"), Some(&json!("Open")));
            assert!(!record.fields.contains_key("name"));
        }
    }

    #[test]
    fn missing_or_empty_identifier_is_a_decode_error() {
        assert!(normalize_record("Lead", &json!({"data": {"status": "Open"}})).is_err());
        assert!(normalize_record("Lead", &json!({"name": ""})).is_err());
        assert!(normalize_record("Lead", &Value::Null).is_err());
    }

    #[test]
    fn empty_and_non_json_bodies_parse_to_null() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("OK"), Value::Null);
        assert_eq!(parse_body("{\"message\":\"ok\"}"), json!({"message": "ok"}));
    }

    #[test]
    fn rows_are_extracted_from_data_or_bare_arrays() {
        let rows = extract_rows("Lead", &json!({"data": [{"name": "A"}, {"name": "B"}]})).unwrap();
        assert_eq!(rows.len(), 2);
        let rows = extract_rows("Lead", &json!([{"name": "A"}])).unwrap();
        assert_eq!(rows[0].get("name"), Some(&json!("A")));
        assert!(extract_rows("Lead", &json!({"data": [1, 2]})).is_err());
        assert!(extract_rows("Lead", &json!({"exc": "boom"})).is_err());
    }
}
