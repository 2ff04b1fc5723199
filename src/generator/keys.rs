//! Natural-key registry: keeps codes and names unique within one run.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct NaturalKeyRegistry {
    known: HashMap<String, HashSet<String>>,
    next_suffix: HashMap<String, u64>,
}

impl NaturalKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key that already exists remotely.
    pub fn remember(&mut self, entity_type: &str, key: &str) {
        self.known
            .entry(entity_type.to_string())
            .or_default()
            .insert(key.to_string());
    }

    pub fn is_known(&self, entity_type: &str, key: &str) -> bool {
        self.known
            .get(entity_type)
            .map_or(false, |keys| keys.contains(key))
    }

    /// Claim `candidate`, or `candidate-N` with a monotonic N when it is taken.
    pub fn claim(&mut self, entity_type: &str, candidate: &str) -> String {
        if !self.is_known(entity_type, candidate) {
            self.remember(entity_type, candidate);
            return candidate.to_string();
        }
        loop {
            let suffix = self.next_suffix.entry(entity_type.to_string()).or_insert(1);
            *suffix += 1;
            let attempt = format!("{}-{}", candidate, suffix);
            if !self.is_known(entity_type, &attempt) {
                self.remember(entity_type, &attempt);
                return attempt;
            }
        }
    }
}
