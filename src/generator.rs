//! Entity Generator
//!
//! Builds one field-complete payload per unit of work from an entity template.
//! Values come from the scope, from parent records already resolved or created
//! in the run, or from an injected value synthesizer. Natural keys stay unique
//! within a run.

use crate::chain::DependencyLink;
use crate::resolver::Projection;
use crate::types::{format_date, parse_date, ExternalRecordRef, Fields};
use chrono::Duration;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

pub mod keys;
pub mod synth;
pub mod template;

pub use keys::NaturalKeyRegistry;
pub use synth::{RandomSynthesizer, ValueSynthesizer};
pub use template::{EntityTemplate, FieldSource, SynthSpec};

/// Parent records visible to the generator, by entity type.
pub type ContextRefs = BTreeMap<String, Vec<ExternalRecordRef>>;

/// One generated unit: the payload and the parent chosen for each parent type.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub entity_type: String,
    pub unit_index: u64,
    pub payload: Fields,
    pub parents: BTreeMap<String, ExternalRecordRef>,
}

impl Candidate {
    /// Short human label: the natural key or display value if present, else the unit number.
    pub fn label(&self, key_field: Option<&str>) -> String {
        key_field
            .and_then(|field| self.payload.get(field))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} #{}", self.entity_type, self.unit_index + 1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("no {parent_type} records available")]
    MissingParent {
        entity_type: String,
        parent_type: String,
    },

    #[error("{message}")]
    Template {
        entity_type: String,
        message: String,
    },
}

impl GenerationError {
    fn template(entity_type: &str, message: impl Into<String>) -> Self {
        GenerationError::Template {
            entity_type: entity_type.to_string(),
            message: message.into(),
        }
    }
}

pub struct EntityGenerator {
    scope: Fields,
    templates: BTreeMap<String, EntityTemplate>,
    links: Vec<DependencyLink>,
    synthesizer: Box<dyn ValueSynthesizer>,
    keys: NaturalKeyRegistry,
    units: HashMap<String, u64>,
    sequences: HashMap<(String, String), u64>,
}

impl EntityGenerator {
    pub fn new(scope: Fields, templates: impl IntoIterator<Item = EntityTemplate>) -> Self {
        Self {
            scope,
            templates: templates
                .into_iter()
                .map(|t| (t.entity_type.clone(), t))
                .collect(),
            links: Vec::new(),
            synthesizer: Box::new(RandomSynthesizer::new()),
            keys: NaturalKeyRegistry::new(),
            units: HashMap::new(),
            sequences: HashMap::new(),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Box<dyn ValueSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_links(mut self, links: &[DependencyLink]) -> Self {
        self.set_links(links);
        self
    }

    pub fn set_links(&mut self, links: &[DependencyLink]) {
        self.links = links.to_vec();
    }

    pub fn template(&self, entity_type: &str) -> Option<&EntityTemplate> {
        self.templates.get(entity_type)
    }

    /// Parent types a candidate of `entity_type` must reference.
    pub fn parent_types(&self, entity_type: &str) -> BTreeSet<String> {
        let mut parents = self
            .template(entity_type)
            .map(EntityTemplate::parent_types)
            .unwrap_or_default();
        parents.extend(
            self.links
                .iter()
                .filter(|link| link.child_type == entity_type)
                .map(|link| link.parent_type.clone()),
        );
        parents
    }

    /// Fields to list for `entity_type`: its own keys plus whatever dependents read from it.
    pub fn projection(&self, entity_type: &str) -> Projection {
        let own = self.template(entity_type);
        let mut fields: Vec<String> = own
            .map(|t| t.projection().fields)
            .unwrap_or_default();
        for template in self.templates.values() {
            fields.extend(template.fields_needed_from(entity_type));
        }
        for link in self.links.iter().filter(|l| l.parent_type == entity_type) {
            if let Some(constraint) = &link.constraint {
                fields.extend(constraint.parent_fields());
            }
        }
        Projection::new(fields, own.and_then(|t| t.display_field.clone()))
    }

    /// Make already-existing records known so natural keys do not collide with them.
    pub fn register_existing(&mut self, entity_type: &str, records: &[ExternalRecordRef]) {
        let Some(key_field) = self
            .template(entity_type)
            .and_then(|t| t.natural_key.clone())
        else {
            return;
        };
        for record in records {
            if let Some(Value::String(key)) = record.field(&key_field) {
                self.keys.remember(entity_type, &key);
            }
        }
    }

    /// Build the next candidate for `entity_type`. `context` is only read.
    pub fn generate(
        &mut self,
        entity_type: &str,
        context: &ContextRefs,
    ) -> Result<Candidate, GenerationError> {
        let template = self
            .template(entity_type)
            .cloned()
            .ok_or_else(|| GenerationError::template(entity_type, "no template configured"))?;

        let unit_index = {
            let counter = self.units.entry(entity_type.to_string()).or_insert(0);
            let index = *counter;
            *counter += 1;
            index
        };

        let mut parents = BTreeMap::new();
        for parent_type in self.parent_types(entity_type) {
            let available = context
                .get(&parent_type)
                .filter(|refs| !refs.is_empty())
                .ok_or_else(|| GenerationError::MissingParent {
                    entity_type: entity_type.to_string(),
                    parent_type: parent_type.clone(),
                })?;
            let chosen = available[(unit_index % available.len() as u64) as usize].clone();
            parents.insert(parent_type, chosen);
        }

        let mut payload = Fields::new();
        for link in self.links.iter().filter(|l| l.child_type == entity_type) {
            if let Some(parent) = parents.get(&link.parent_type) {
                payload.insert(link.child_field.clone(), Value::String(parent.id.clone()));
            }
        }
        for (field, source) in &template.fields {
            let value = self.field_value(entity_type, field, source, &parents)?;
            payload.insert(field.clone(), value);
        }

        if let Some(key_field) = &template.natural_key {
            let proposed = match payload.get(key_field) {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => {
                    return Err(GenerationError::template(
                        entity_type,
                        format!("natural key '{}' was not produced", key_field),
                    ))
                }
            };
            let claimed = self.keys.claim(entity_type, &proposed);
            payload.insert(key_field.clone(), Value::String(claimed));
        }

        Ok(Candidate {
            entity_type: entity_type.to_string(),
            unit_index,
            payload,
            parents,
        })
    }

    fn field_value(
        &mut self,
        entity_type: &str,
        field: &str,
        source: &FieldSource,
        parents: &BTreeMap<String, ExternalRecordRef>,
    ) -> Result<Value, GenerationError> {
        let parent_of = |parent_type: &str| {
            parents.get(parent_type).ok_or_else(|| GenerationError::MissingParent {
                entity_type: entity_type.to_string(),
                parent_type: parent_type.to_string(),
            })
        };
        match source {
            FieldSource::Fixed { fixed } => Ok(fixed.clone()),
            FieldSource::Scope { scope } => self.scope.get(scope).cloned().ok_or_else(|| {
                GenerationError::template(entity_type, format!("scope value '{}' is not set", scope))
            }),
            FieldSource::Parent {
                parent,
                field: None,
            } => Ok(Value::String(parent_of(parent)?.id.clone())),
            FieldSource::Parent {
                parent,
                field: Some(parent_field),
            } => parent_of(parent)?.field(parent_field).ok_or_else(|| {
                GenerationError::template(
                    entity_type,
                    format!("{} record has no '{}'", parent, parent_field),
                )
            }),
            FieldSource::Synth(spec) => match spec {
                SynthSpec::PersonName => Ok(Value::String(self.synthesizer.person_name())),
                SynthSpec::Word => Ok(Value::String(self.synthesizer.word())),
                SynthSpec::Sequence {
                    prefix,
                    start,
                    width,
                } => {
                    let counter = self
                        .sequences
                        .entry((entity_type.to_string(), field.to_string()))
                        .or_insert(0);
                    let next = start + *counter;
                    *counter += 1;
                    Ok(Value::String(format!(
                        "{}{:0width$}",
                        prefix,
                        next,
                        width = *width
                    )))
                }
                SynthSpec::Integer { min, max } => {
                    Ok(Value::from(self.synthesizer.integer(*min, *max)))
                }
                SynthSpec::Choice { options } => {
                    if options.is_empty() {
                        return Err(GenerationError::template(
                            entity_type,
                            format!("field '{}' has no choices", field),
                        ));
                    }
                    Ok(options[self.synthesizer.index(options.len())].clone())
                }
                SynthSpec::Date { start, end } => {
                    Ok(format_date(self.synthesizer.date_between(*start, *end)))
                }
                SynthSpec::DateAfterParent {
                    parent,
                    field: parent_field,
                    min_days,
                    max_days,
                } => {
                    let base = parent_of(parent)?
                        .field(parent_field)
                        .as_ref()
                        .and_then(parse_date)
                        .ok_or_else(|| {
                            GenerationError::template(
                                entity_type,
                                format!("{} record has no date in '{}'", parent, parent_field),
                            )
                        })?;
                    let offset = self.synthesizer.integer(*min_days, *max_days);
                    let date = base
                        .checked_add_signed(Duration::days(offset))
                        .unwrap_or(base);
                    Ok(format_date(date))
                }
            },
        }
    }
}
