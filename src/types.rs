//! Core data types shared by the client, resolver, generator and orchestrator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// JSON object used for payloads, filters and carried fields.
pub type Fields = Map<String, Value>;

/// Raw record as returned by a list or get call.
pub type Record = Map<String, Value>;

/// Remote date format; datetimes are truncated to their date part.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> Value {
    Value::String(date.format(DATE_FORMAT).to_string())
}

/// A record that exists (or now exists) in the remote system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecordRef {
    pub entity_type: String,
    /// Remote identifier; never empty once the record is confirmed created.
    pub id: String,
    pub display_name: String,
    /// Only the subset of fields dependents need (join dates, statuses, ...).
    #[serde(default)]
    pub fields: Fields,
}

impl ExternalRecordRef {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            entity_type: entity_type.into(),
            display_name: id.clone(),
            id,
            fields: Fields::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Field lookup where `name` resolves to the identifier itself.
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == "name" {
            return Some(Value::String(self.id.clone()));
        }
        self.fields.get(name).cloned()
    }
}

/// Desired total count of one entity type under a scope filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTarget {
    pub entity_type: String,
    #[serde(default)]
    pub scope_filter: Fields,
    pub target_count: u64,
}

impl GenerationTarget {
    pub fn new(entity_type: impl Into<String>, target_count: u64) -> Self {
        Self {
            entity_type: entity_type.into(),
            scope_filter: Fields::new(),
            target_count,
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.scope_filter.insert(field.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

/// Bounded retry budget. Used independently for transient failures and throttling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_seconds")]
    pub base_delay_seconds: f64,
    #[serde(default = "default_strategy")]
    pub strategy: BackoffStrategy,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_seconds() -> f64 {
    1.0
}

fn default_strategy() -> BackoffStrategy {
    BackoffStrategy::Exponential
}

// 2^16 * base is already far past any sensible wait.
const MAX_BACKOFF_EXPONENT: u32 = 16;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_seconds: default_base_delay_seconds(),
            strategy: default_strategy(),
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, base_delay_seconds: f64) -> Self {
        Self {
            max_attempts,
            base_delay_seconds,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay_seconds: f64) -> Self {
        Self {
            max_attempts,
            base_delay_seconds,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// No waiting between attempts; used by tests and dry environments.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, 0.0)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let base = if self.base_delay_seconds.is_finite() && self.base_delay_seconds > 0.0 {
            self.base_delay_seconds
        } else {
            return Duration::ZERO;
        };
        let seconds = match self.strategy {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Exponential => {
                let exponent = failed_attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
                base * f64::from(2u32.pow(exponent))
            }
        };
        Duration::from_secs_f64(seconds)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.base_delay_seconds.is_finite() || self.base_delay_seconds < 0.0 {
            return Err(format!(
                "base_delay_seconds must be a non-negative number, got {}",
                self.base_delay_seconds
            ));
        }
        Ok(())
    }
}

/// Tri-state lifecycle flag carried by submittable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocStatus {
    Draft,
    Submitted,
    Cancelled,
}

impl DocStatus {
    pub const FIELD: &'static str = "docstatus";

    pub fn code(self) -> u8 {
        match self {
            DocStatus::Draft => 0,
            DocStatus::Submitted => 1,
            DocStatus::Cancelled => 2,
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_u64()? {
            0 => Some(DocStatus::Draft),
            1 => Some(DocStatus::Submitted),
            2 => Some(DocStatus::Cancelled),
            _ => None,
        }
    }

    /// Read the flag from a record; records without one are drafts.
    pub fn of(record: &Record) -> Self {
        record
            .get(Self::FIELD)
            .and_then(Self::from_value)
            .unwrap_or(DocStatus::Draft)
    }

    /// Partial payload that moves a record into this state.
    pub fn as_patch(self) -> Fields {
        let mut patch = Fields::new();
        patch.insert(Self::FIELD.to_string(), Value::from(self.code()));
        patch
    }
}
