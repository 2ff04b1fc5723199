//! Dependency links and the constraints a child must satisfy against its parent.

use crate::types::{parse_date, ExternalRecordRef, Fields};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub type LinkPredicate = Arc<dyn Fn(&ExternalRecordRef, &Fields) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum Constraint {
    /// Child date field must be on or after the parent's date field.
    DateNotBefore {
        parent_field: String,
        child_field: String,
    },
    /// Arbitrary predicate. `parent_fields` lists what it reads from the parent,
    /// since only listed fields are fetched.
    Custom {
        description: String,
        parent_fields: Vec<String>,
        predicate: LinkPredicate,
    },
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::DateNotBefore {
                parent_field,
                child_field,
            } => f
                .debug_struct("DateNotBefore")
                .field("parent_field", parent_field)
                .field("child_field", child_field)
                .finish(),
            Constraint::Custom {
                description,
                parent_fields,
                ..
            } => f
                .debug_struct("Custom")
                .field("description", description)
                .field("parent_fields", parent_fields)
                .finish_non_exhaustive(),
        }
    }
}

impl Constraint {
    pub fn date_not_before(parent_field: impl Into<String>, child_field: impl Into<String>) -> Self {
        Constraint::DateNotBefore {
            parent_field: parent_field.into(),
            child_field: child_field.into(),
        }
    }

    pub fn custom<F>(
        description: impl Into<String>,
        parent_fields: impl IntoIterator<Item = impl Into<String>>,
        predicate: F,
    ) -> Self
    where
        F: Fn(&ExternalRecordRef, &Fields) -> bool + Send + Sync + 'static,
    {
        Constraint::Custom {
            description: description.into(),
            parent_fields: parent_fields.into_iter().map(Into::into).collect(),
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate against the chosen parent and the candidate payload.
    ///
    /// A parent without a parseable date cannot be violated; a child whose
    /// date is missing or unparseable can.
    pub fn check(&self, parent: &ExternalRecordRef, candidate: &Fields) -> bool {
        match self {
            Constraint::DateNotBefore {
                parent_field,
                child_field,
            } => {
                let Some(parent_date) = parent.field(parent_field).as_ref().and_then(parse_date)
                else {
                    return true;
                };
                candidate
                    .get(child_field)
                    .and_then(parse_date)
                    .map_or(false, |child_date| child_date >= parent_date)
            }
            Constraint::Custom { predicate, .. } => predicate(parent, candidate),
        }
    }

    pub fn violation_reason(&self) -> &'static str {
        match self {
            Constraint::DateNotBefore { .. } => "date precedes parent",
            Constraint::Custom { .. } => "constraint violated",
        }
    }

    /// Parent fields the constraint reads.
    pub fn parent_fields(&self) -> Vec<String> {
        match self {
            Constraint::DateNotBefore { parent_field, .. } => vec![parent_field.clone()],
            Constraint::Custom { parent_fields, .. } => parent_fields.clone(),
        }
    }
}

/// Configuration form of a constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintSpec {
    DateNotBefore {
        parent_field: String,
        child_field: String,
    },
}

impl From<&ConstraintSpec> for Constraint {
    fn from(spec: &ConstraintSpec) -> Self {
        match spec {
            ConstraintSpec::DateNotBefore {
                parent_field,
                child_field,
            } => Constraint::date_not_before(parent_field.clone(), child_field.clone()),
        }
    }
}

/// A child entity type references an already-created parent through `child_field`.
#[derive(Debug, Clone)]
pub struct DependencyLink {
    pub parent_type: String,
    pub child_type: String,
    pub child_field: String,
    pub constraint: Option<Constraint>,
}

impl DependencyLink {
    pub fn new(
        parent_type: impl Into<String>,
        child_type: impl Into<String>,
        child_field: impl Into<String>,
    ) -> Self {
        Self {
            parent_type: parent_type.into(),
            child_type: child_type.into(),
            child_field: child_field.into(),
            constraint: None,
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }
}
