//! Configuration System
//!
//! One explicit configuration value, built once before a run and handed to the
//! client and orchestrator. Layered sources: built-in defaults, the global file
//! in the user config directory, `./recsync.toml`, then `RECSYNC__*` environment
//! variables.

use crate::chain::{dependency_order, with_parent_targets, ConstraintSpec, DependencyLink, Edge};
use crate::generator::{EntityTemplate, FieldSource};
use crate::logging::LoggingConfig;
use crate::types::{Fields, GenerationTarget, RetryPolicy};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecsyncConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub scope: ScopeConfig,

    /// Retry budget for transient failures (connection errors, timeouts, 5xx)
    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub throttle: ThrottleConfig,

    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    #[serde(default)]
    pub links: Vec<LinkConfig>,

    #[serde(default)]
    pub templates: Vec<EntityTemplate>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote endpoint and credential pair
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    /// Rows requested per list page, at most [`MAX_PAGE_SIZE`]. Listing stops at
    /// the first short page, so a page larger than the server serves would undercount.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Largest page the remote serves for one list call.
pub const MAX_PAGE_SIZE: usize = 500;

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ConnectionConfig {
    /// `token <key>:<secret>`
    pub fn authorization(&self) -> String {
        format!("token {}:{}", self.api_key, self.api_secret)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url is required".to_string());
        }
        Url::parse(&self.base_url).map_err(|e| format!("Invalid base_url '{}': {}", self.base_url, e))?;
        if self.api_key.trim().is_empty() || self.api_secret.trim().is_empty() {
            return Err("api_key and api_secret are required".to_string());
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(format!("page_size must be between 1 and {}", MAX_PAGE_SIZE));
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

// Credentials stay out of logs and panic messages.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "***" };
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Scope values available to templates; `company` also scopes target filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub company: Option<String>,

    #[serde(default)]
    pub values: Fields,
}

impl ScopeConfig {
    pub fn scope_values(&self) -> Fields {
        let mut values = self.values.clone();
        if let Some(company) = &self.company {
            values.insert("company".to_string(), Value::String(company.clone()));
        }
        values
    }
}

/// Throttle guard settings, tuned independently of transient retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_throttle_policy")]
    pub policy: RetryPolicy,

    /// Statuses treated as "slow down"
    #[serde(default = "default_throttle_statuses")]
    pub statuses: Vec<u16>,
}

fn default_throttle_policy() -> RetryPolicy {
    RetryPolicy::exponential(4, 2.0)
}

fn default_throttle_statuses() -> Vec<u16> {
    vec![429, 417]
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            policy: default_throttle_policy(),
            statuses: default_throttle_statuses(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub entity_type: String,

    pub count: u64,

    /// Extra equality filters
    #[serde(default)]
    pub filter: Fields,

    /// Add `company = <scope.company>` to the filter
    #[serde(default = "default_true")]
    pub scoped: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub parent: String,
    pub child: String,
    pub child_field: String,
    #[serde(default)]
    pub constraint: Option<ConstraintSpec>,
}

impl LinkConfig {
    pub fn to_link(&self) -> DependencyLink {
        let link = DependencyLink::new(&self.parent, &self.child, &self.child_field);
        match &self.constraint {
            Some(spec) => link.with_constraint(spec.into()),
            None => link,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Connection(String),
    Retry(String),
    Throttle(String),
    Target(String, String),
    Link(String),
    Template(String, String),
    Plan(String),
    Logging(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Connection(msg) => write!(f, "Connection: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Throttle(msg) => write!(f, "Throttle: {}", msg),
            ValidationError::Target(name, msg) => write!(f, "Target '{}': {}", name, msg),
            ValidationError::Link(msg) => write!(f, "Link: {}", msg),
            ValidationError::Template(name, msg) => write!(f, "Template '{}': {}", name, msg),
            ValidationError::Plan(msg) => write!(f, "Plan: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RecsyncConfig {
    /// Targets with scope filters applied. Computed once per run.
    pub fn generation_targets(&self) -> Vec<GenerationTarget> {
        self.targets
            .iter()
            .map(|target| {
                let mut generation = GenerationTarget::new(&target.entity_type, target.count);
                generation.scope_filter = target.filter.clone();
                if target.scoped {
                    if let Some(company) = &self.scope.company {
                        generation
                            .scope_filter
                            .entry("company".to_string())
                            .or_insert_with(|| Value::String(company.clone()));
                    }
                }
                generation
            })
            .collect()
    }

    /// Configured targets plus every untargeted parent type as a count-zero target,
    /// scoped to the configured company.
    pub fn seed_targets(&self) -> Vec<GenerationTarget> {
        let edges = self.dependency_edges();
        let mut targets = self.generation_targets();
        let configured = targets.len();
        loop {
            let expanded = with_parent_targets(&targets, &edges);
            if expanded.len() == targets.len() {
                break;
            }
            targets = expanded;
        }
        if let Some(company) = &self.scope.company {
            for implicit in &mut targets[configured..] {
                implicit
                    .scope_filter
                    .insert("company".to_string(), Value::String(company.clone()));
            }
        }
        targets
    }

    pub fn dependency_links(&self) -> Vec<DependencyLink> {
        self.links.iter().map(LinkConfig::to_link).collect()
    }

    /// Declared links plus template parent references, as ordering edges.
    pub fn dependency_edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .links
            .iter()
            .map(|link| (link.parent.clone(), link.child.clone()))
            .collect();
        for template in &self.templates {
            for parent in template.parent_types() {
                let edge = (parent, template.entity_type.clone());
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    pub fn template(&self, entity_type: &str) -> Option<&EntityTemplate> {
        self.templates.iter().find(|t| t.entity_type == entity_type)
    }

    /// Validate the entire configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.connection.validate() {
            errors.push(ValidationError::Connection(e));
        }
        if let Err(e) = self.retry.validate() {
            errors.push(ValidationError::Retry(e));
        }
        if let Err(e) = self.throttle.policy.validate() {
            errors.push(ValidationError::Throttle(e));
        }
        if let Some(status) = self
            .throttle
            .statuses
            .iter()
            .find(|s| !(400..600).contains(*s))
        {
            errors.push(ValidationError::Throttle(format!(
                "{} is not an HTTP error status",
                status
            )));
        }
        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        let mut seen_targets = HashSet::new();
        for target in &self.targets {
            if target.entity_type.trim().is_empty() {
                errors.push(ValidationError::Target(
                    target.entity_type.clone(),
                    "entity_type cannot be empty".to_string(),
                ));
                continue;
            }
            if !seen_targets.insert(target.entity_type.as_str()) {
                errors.push(ValidationError::Target(
                    target.entity_type.clone(),
                    "targeted more than once".to_string(),
                ));
            }
            if target.count > 0 && self.template(&target.entity_type).is_none() {
                errors.push(ValidationError::Target(
                    target.entity_type.clone(),
                    "no template configured".to_string(),
                ));
            }
        }

        for link in &self.links {
            if link.parent.trim().is_empty() || link.child.trim().is_empty() {
                errors.push(ValidationError::Link(
                    "parent and child entity types are required".to_string(),
                ));
            } else if link.parent == link.child {
                errors.push(ValidationError::Link(format!(
                    "{} cannot link to itself",
                    link.parent
                )));
            }
            if link.child_field.trim().is_empty() {
                errors.push(ValidationError::Link(format!(
                    "{} -> {} needs a child_field",
                    link.parent, link.child
                )));
            }
        }

        let scope_values = self.scope.scope_values();
        let mut seen_templates = HashSet::new();
        for template in &self.templates {
            if !seen_templates.insert(template.entity_type.as_str()) {
                errors.push(ValidationError::Template(
                    template.entity_type.clone(),
                    "defined more than once".to_string(),
                ));
            }
            if let Err(e) = template.validate() {
                errors.push(ValidationError::Template(template.entity_type.clone(), e));
            }
            for source in template.fields.values() {
                if let FieldSource::Scope { scope } = source {
                    if !scope_values.contains_key(scope) {
                        errors.push(ValidationError::Template(
                            template.entity_type.clone(),
                            format!("scope value '{}' is not set", scope),
                        ));
                    }
                }
            }
        }

        if let Err(e) = dependency_order(&self.seed_targets(), &self.dependency_edges()) {
            errors.push(ValidationError::Plan(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SynthSpec;
    use serde_json::json;

    fn valid() -> RecsyncConfig {
        let mut config = RecsyncConfig::default();
        config.connection.base_url = "https://erp.example.com".to_string();
        config.connection.api_key = "key".to_string();
        config.connection.api_secret = "secret".to_string();
        config.scope.company = Some("Acme".to_string());
        config.templates.push(
            EntityTemplate::new("Lead")
                .with_natural_key("lead_name")
                .with_field("lead_name", FieldSource::Synth(SynthSpec::PersonName))
                .with_field("company", FieldSource::scope("company")),
        );
        config.targets.push(TargetConfig {
            entity_type: "Lead".to_string(),
            count: 50,
            filter: Fields::new(),
            scoped: true,
        });
        config
    }

    #[test]
    fn defaults_are_sensible() {
        let config = RecsyncConfig::default();
        assert_eq!(config.connection.page_size, 500);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.throttle.statuses, vec![429, 417]);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn every_problem_is_reported() {
        let mut config = valid();
        config.connection.api_secret.clear();
        config.retry.max_attempts = 0;
        config.targets.push(TargetConfig {
            entity_type: "Employee".to_string(),
            count: 3,
            filter: Fields::new(),
            scoped: true,
        });
        config.scope.company = None;

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Connection(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Retry(_))));
        assert!(errors
            .iter()
            .any(|e| e == &ValidationError::Target("Employee".to_string(), "no template configured".to_string())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Template(_, _))));
    }

    #[test]
    fn cyclic_links_are_a_plan_error() {
        let mut config = valid();
        config.templates.push(EntityTemplate::new("Opportunity"));
        config.targets.push(TargetConfig {
            entity_type: "Opportunity".to_string(),
            count: 1,
            filter: Fields::new(),
            scoped: false,
        });
        for (parent, child) in [("Lead", "Opportunity"), ("Opportunity", "Lead")] {
            config.links.push(LinkConfig {
                parent: parent.to_string(),
                child: child.to_string(),
                child_field: "party_name".to_string(),
                constraint: None,
            });
        }
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Plan(_))));
    }

    #[test]
    fn generation_targets_apply_company_scope() {
        let mut config = valid();
        config.targets.push(TargetConfig {
            entity_type: "Asset Category".to_string(),
            count: 2,
            filter: Fields::new(),
            scoped: false,
        });
        let targets = config.generation_targets();
        assert_eq!(targets[0].scope_filter.get("company"), Some(&json!("Acme")));
        assert!(targets[1].scope_filter.is_empty());
    }

    #[test]
    fn seed_targets_add_scoped_parents_without_a_target() {
        let mut config = valid();
        config.targets.push(TargetConfig {
            entity_type: "Attendance".to_string(),
            count: 3,
            filter: Fields::new(),
            scoped: true,
        });
        config.links.push(LinkConfig {
            parent: "Employee".to_string(),
            child: "Attendance".to_string(),
            child_field: "employee".to_string(),
            constraint: None,
        });

        let targets = config.seed_targets();
        assert_eq!(targets.len(), config.generation_targets().len() + 1);
        let employee = targets.last().unwrap();
        assert_eq!(employee.entity_type, "Employee");
        assert_eq!(employee.target_count, 0);
        assert_eq!(employee.scope_filter.get("company"), Some(&json!("Acme")));
        assert!(config.generation_targets().iter().all(|t| t.entity_type != "Employee"));
    }

    #[test]
    fn page_size_above_the_server_cap_is_rejected() {
        let mut config = valid();
        config.connection.page_size = MAX_PAGE_SIZE + 1;
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::Connection(message) if message.contains("page_size")
        )));

        config.connection.page_size = MAX_PAGE_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let rendered = format!("{:?}", valid().connection);
        assert!(!rendered.contains("\"secret\""));
        assert!(!rendered.contains("\"key\""));
        assert!(rendered.contains("***"));
        assert_eq!(valid().connection.authorization(), "token key:secret");
    }
}
