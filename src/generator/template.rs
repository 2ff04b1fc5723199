//! Entity templates: per-entity field recipes declared in configuration.

use crate::resolver::Projection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Where one payload field gets its value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSource {
    /// Freshly synthesized value
    Synth(SynthSpec),
    /// Constant value
    Fixed { fixed: Value },
    /// Named scope value (e.g. the company)
    Scope { scope: String },
    /// Parent identifier, or one of the parent's carried fields
    Parent {
        parent: String,
        #[serde(default)]
        field: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "synth", rename_all = "snake_case")]
pub enum SynthSpec {
    PersonName,
    Word,
    Sequence {
        #[serde(default)]
        prefix: String,
        #[serde(default = "default_sequence_start")]
        start: u64,
        #[serde(default = "default_sequence_width")]
        width: usize,
    },
    Integer {
        min: i64,
        max: i64,
    },
    Choice {
        options: Vec<Value>,
    },
    Date {
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Date offset from a date carried on the chosen parent.
    DateAfterParent {
        parent: String,
        field: String,
        #[serde(default)]
        min_days: i64,
        max_days: i64,
    },
}

fn default_sequence_start() -> u64 {
    1
}

fn default_sequence_width() -> usize {
    4
}

impl FieldSource {
    pub fn fixed(value: impl Into<Value>) -> Self {
        FieldSource::Fixed {
            fixed: value.into(),
        }
    }

    pub fn scope(name: impl Into<String>) -> Self {
        FieldSource::Scope { scope: name.into() }
    }

    pub fn parent_id(parent: impl Into<String>) -> Self {
        FieldSource::Parent {
            parent: parent.into(),
            field: None,
        }
    }

    pub fn parent_field(parent: impl Into<String>, field: impl Into<String>) -> Self {
        FieldSource::Parent {
            parent: parent.into(),
            field: Some(field.into()),
        }
    }

    /// Parent entity type this source reads from, and the carried field it needs.
    fn parent_dependency(&self) -> Option<(&str, Option<&str>)> {
        match self {
            FieldSource::Parent { parent, field } => Some((parent, field.as_deref())),
            FieldSource::Synth(SynthSpec::DateAfterParent { parent, field, .. }) => {
                Some((parent, Some(field)))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTemplate {
    pub entity_type: String,

    /// Field the remote treats as a natural key; kept unique within a run
    #[serde(default)]
    pub natural_key: Option<String>,

    #[serde(default)]
    pub display_field: Option<String>,

    /// Extra fields retained on created refs for dependents
    #[serde(default)]
    pub carry_fields: Vec<String>,

    /// Submit (docstatus 1) every record right after creating it
    #[serde(default)]
    pub submit: bool,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldSource>,
}

impl EntityTemplate {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            natural_key: None,
            display_field: None,
            carry_fields: Vec::new(),
            submit: false,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, source: FieldSource) -> Self {
        self.fields.insert(name.into(), source);
        self
    }

    pub fn with_natural_key(mut self, field: impl Into<String>) -> Self {
        self.natural_key = Some(field.into());
        self
    }

    pub fn with_display_field(mut self, field: impl Into<String>) -> Self {
        self.display_field = Some(field.into());
        self
    }

    pub fn carrying(mut self, field: impl Into<String>) -> Self {
        self.carry_fields.push(field.into());
        self
    }

    pub fn submitted(mut self) -> Self {
        self.submit = true;
        self
    }

    /// Parent entity types referenced by this template's fields.
    pub fn parent_types(&self) -> BTreeSet<String> {
        self.fields
            .values()
            .filter_map(FieldSource::parent_dependency)
            .map(|(parent, _)| parent.to_string())
            .collect()
    }

    /// Fields of `parent_type` this template reads from a chosen parent.
    pub fn fields_needed_from(&self, parent_type: &str) -> Vec<String> {
        self.fields
            .values()
            .filter_map(FieldSource::parent_dependency)
            .filter(|(parent, _)| *parent == parent_type)
            .filter_map(|(_, field)| field.map(str::to_string))
            .collect()
    }

    /// Own projection: natural key and carry fields, named by the display field.
    pub fn projection(&self) -> Projection {
        Projection::new(
            self.natural_key
                .iter()
                .chain(self.carry_fields.iter())
                .cloned(),
            self.display_field.clone(),
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.entity_type.trim().is_empty() {
            return Err("entity_type cannot be empty".to_string());
        }
        if let Some(key) = &self.natural_key {
            if !self.fields.contains_key(key) {
                return Err(format!("natural_key '{}' has no field source", key));
            }
        }
        for (name, source) in &self.fields {
            match source {
                FieldSource::Synth(SynthSpec::Integer { min, max }) if min > max => {
                    return Err(format!("field '{}': integer min exceeds max", name));
                }
                FieldSource::Synth(SynthSpec::Choice { options }) if options.is_empty() => {
                    return Err(format!("field '{}': choice needs at least one option", name));
                }
                FieldSource::Synth(SynthSpec::Date { start, end }) if start > end => {
                    return Err(format!("field '{}': date start is after end", name));
                }
                FieldSource::Synth(SynthSpec::DateAfterParent {
                    min_days, max_days, ..
                }) if min_days > max_days => {
                    return Err(format!("field '{}': min_days exceeds max_days", name));
                }
                FieldSource::Parent { parent, .. } if parent == &self.entity_type => {
                    return Err(format!("field '{}': an entity cannot be its own parent", name));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
