//! Dependency Chain Orchestrator
//!
//! Sequences work across related entity types. Seeding walks targets parents
//! first (Resolve, Generate, Constrain, Persist, Advance); purging walks them
//! children first. Execution is strictly sequential: each remote call is
//! awaited and observed before the next unit is considered.

use crate::client::RecordClient;
use crate::error::ApiError;
use crate::generator::EntityGenerator;
use crate::types::GenerationTarget;

pub mod batch;
pub mod confirm;
pub mod constraint;
pub mod plan;
pub mod purge;
pub mod run;

pub use batch::{BatchResult, FailedUnit, SkippedUnit, TargetRecord, TargetState};
pub use confirm::{ConfirmationGate, ConfirmationRequest, Operation, PresetConfirmation};
pub use constraint::{Constraint, ConstraintSpec, DependencyLink};
pub use plan::{dependency_order, restrict_to, with_parent_targets, Edge};

pub struct ChainOrchestrator<'a, C: ?Sized> {
    client: &'a C,
    generator: EntityGenerator,
    gate: Box<dyn ConfirmationGate + 'a>,
}

impl<'a, C: RecordClient + ?Sized> ChainOrchestrator<'a, C> {
    /// Destructive and irreversible targets are declined unless a gate is supplied.
    pub fn new(client: &'a C, generator: EntityGenerator) -> Self {
        Self {
            client,
            generator,
            gate: Box::new(PresetConfirmation::deny()),
        }
    }

    pub fn with_gate(mut self, gate: impl ConfirmationGate + 'a) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn generator(&self) -> &EntityGenerator {
        &self.generator
    }

    /// Ordering edges: declared links plus parents referenced by templates.
    pub fn edges(&mut self, targets: &[GenerationTarget], links: &[DependencyLink]) -> Vec<Edge> {
        self.generator.set_links(links);
        let mut edges: Vec<Edge> = Vec::new();
        for target in targets {
            for parent in self.generator.parent_types(&target.entity_type) {
                let edge = (parent, target.entity_type.clone());
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Seed plan: targets widened with every untargeted ancestor, and their order.
    fn seed_plan(
        &mut self,
        targets: &[GenerationTarget],
        links: &[DependencyLink],
    ) -> Result<(Vec<GenerationTarget>, Vec<usize>), ApiError> {
        let mut planned = targets.to_vec();
        loop {
            let edges = self.edges(&planned, links);
            let expanded = with_parent_targets(&planned, &edges);
            if expanded.len() == planned.len() {
                let order = dependency_order(&planned, &edges)?;
                return Ok((planned, order));
            }
            planned = expanded;
        }
    }
}
