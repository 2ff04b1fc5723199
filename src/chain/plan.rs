//! Target ordering: parents before children, declaration order between peers.

use crate::error::ApiError;
use crate::types::GenerationTarget;
use std::collections::{BTreeSet, HashMap};

/// Edge `(parent_type, child_type)`. Edges touching a non-target type do not order anything.
pub type Edge = (String, String);

/// Indices into `targets` in dependency order.
///
/// Kahn's algorithm with a ready set keyed by declaration index, so the result is
/// stable for a given input. Duplicate targets and cycles are plan errors.
pub fn dependency_order(targets: &[GenerationTarget], edges: &[Edge]) -> Result<Vec<usize>, ApiError> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (index, target) in targets.iter().enumerate() {
        if index_of.insert(&target.entity_type, index).is_some() {
            return Err(ApiError::PlanError(format!(
                "Entity type {} is targeted more than once",
                target.entity_type
            )));
        }
    }

    let mut children: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); targets.len()];
    let mut in_degree = vec![0usize; targets.len()];
    for (parent, child) in edges {
        let (Some(&p), Some(&c)) = (index_of.get(parent.as_str()), index_of.get(child.as_str()))
        else {
            continue;
        };
        if p == c {
            return Err(ApiError::PlanError(format!(
                "Entity type {} depends on itself",
                parent
            )));
        }
        if children[p].insert(c) {
            in_degree[c] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..targets.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(targets.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &child in &children[next] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() != targets.len() {
        let stuck: Vec<&str> = (0..targets.len())
            .filter(|i| !order.contains(i))
            .map(|i| targets[i].entity_type.as_str())
            .collect();
        return Err(ApiError::PlanError(format!(
            "Dependency cycle between: {}",
            stuck.join(", ")
        )));
    }
    Ok(order)
}

/// Keep only `only`, adding its ancestors as count-zero targets so their existing
/// records are still resolved as context.
pub fn restrict_to(
    targets: &[GenerationTarget],
    edges: &[Edge],
    only: &str,
) -> Result<Vec<GenerationTarget>, ApiError> {
    if !targets.iter().any(|t| t.entity_type == only) {
        return Err(ApiError::PlanError(format!("No target configured for {}", only)));
    }
    let mut needed: BTreeSet<&str> = BTreeSet::new();
    let mut pending = vec![only];
    while let Some(entity) = pending.pop() {
        for (parent, child) in edges {
            if child == entity && needed.insert(parent.as_str()) {
                pending.push(parent.as_str());
            }
        }
    }

    Ok(targets
        .iter()
        .filter_map(|target| {
            if target.entity_type == only {
                Some(target.clone())
            } else if needed.contains(target.entity_type.as_str()) {
                let mut context_only = target.clone();
                context_only.target_count = 0;
                Some(context_only)
            } else {
                None
            }
        })
        .collect())
}

/// Append a count-zero target for every parent type that has no target of its own,
/// so its existing records are resolved before any child needs them.
pub fn with_parent_targets(targets: &[GenerationTarget], edges: &[Edge]) -> Vec<GenerationTarget> {
    let mut expanded = targets.to_vec();
    for (parent, child) in edges {
        let child_targeted = expanded.iter().any(|t| &t.entity_type == child);
        let parent_targeted = expanded.iter().any(|t| &t.entity_type == parent);
        if child_targeted && !parent_targeted {
            expanded.push(GenerationTarget::new(parent.clone(), 0));
        }
    }
    expanded
}
