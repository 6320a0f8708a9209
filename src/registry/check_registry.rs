// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Check Registry & Planner
 * Validates check declarations and batches them by dependency order
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::check::CheckDefinition;
use crate::errors::PlanError;

/// Ordered collection of registered checks. Registration order is
/// significant: it is the tie-break order for applicability filtering and
/// the order within a planned batch.
#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Arc<CheckDefinition>>,
    index: HashMap<String, usize>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check. Re-registering an id replaces the earlier
    /// definition in place, keeping its original position.
    pub fn register(&mut self, check: CheckDefinition) -> &mut Self {
        let id = check.id().to_string();
        let check = Arc::new(check);
        match self.index.get(&id) {
            Some(&position) => {
                warn!("check `{}` re-registered, replacing earlier definition", id);
                self.checks[position] = check;
            }
            None => {
                self.index.insert(id, self.checks.len());
                self.checks.push(check);
            }
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<CheckDefinition>> {
        self.index.get(id).map(|&position| &self.checks[position])
    }

    pub fn checks(&self) -> &[Arc<CheckDefinition>] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Layer checks into batches by dependency order: batch 0 holds every
    /// check without dependencies, each later batch holds the checks
    /// whose dependencies all live in earlier batches. Fails when a
    /// declared dependency is unregistered or the graph has a cycle. No
    /// stub nodes are ever created for unknown ids.
    pub fn plan(&self) -> Result<ScanPlan, PlanError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for check in &self.checks {
            in_degree.entry(check.id()).or_insert(0);
            for dependency in &check.metadata.depends_on {
                if !self.index.contains_key(dependency) {
                    return Err(PlanError::UnknownDependency {
                        check: check.id().to_string(),
                        dependency: dependency.clone(),
                    });
                }
                *in_degree.entry(check.id()).or_insert(0) += 1;
                dependents
                    .entry(dependency.as_str())
                    .or_default()
                    .push(check.id());
            }
        }

        let mut batches: Vec<Vec<Arc<CheckDefinition>>> = Vec::new();
        let mut placed = 0usize;

        while placed < self.checks.len() {
            // registration order within the layer
            let ready: Vec<&Arc<CheckDefinition>> = self
                .checks
                .iter()
                .filter(|check| in_degree.get(check.id()) == Some(&0))
                .collect();

            if ready.is_empty() {
                let mut remaining: Vec<String> = in_degree
                    .iter()
                    .filter(|(_, &degree)| degree > 0)
                    .map(|(id, _)| id.to_string())
                    .collect();
                remaining.sort();
                return Err(PlanError::CyclicDependencies { remaining });
            }

            for check in &ready {
                in_degree.remove(check.id());
            }
            for check in &ready {
                for dependent in dependents.get(check.id()).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                    }
                }
            }

            placed += ready.len();
            batches.push(ready.into_iter().map(Arc::clone).collect());
        }

        Ok(ScanPlan { batches })
    }
}

/// The execution plan: batches in dependency order, stable for the whole
/// scan. Within a batch, order carries no dependency meaning.
#[derive(Clone)]
pub struct ScanPlan {
    batches: Vec<Vec<Arc<CheckDefinition>>>,
}

impl ScanPlan {
    pub fn batches(&self) -> &[Vec<Arc<CheckDefinition>>] {
        &self.batches
    }

    pub fn total_checks(&self) -> usize {
        self.batches.iter().map(|batch| batch.len()).sum()
    }

    /// Batch index of a check, for layering assertions.
    pub fn batch_of(&self, check_id: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|check| check.id() == check_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckBuilder, CheckMetadata, CheckType, StepAction};
    use crate::types::Severity;

    fn check(id: &str, depends_on: &[&str]) -> CheckDefinition {
        CheckBuilder::new(CheckMetadata {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            check_type: CheckType::Passive,
            tags: Vec::new(),
            severities: vec![Severity::Low],
            aggressivity: None,
            min_aggressivity: None,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            skip_if_found_by: None,
        })
        .step("scan", |_state, _ctx| async move { Ok(StepAction::done()) })
        .build()
    }

    #[test]
    fn independent_checks_form_one_batch() {
        let mut registry = CheckRegistry::new();
        registry.register(check("a", &[]));
        registry.register(check("b", &[]));

        let plan = registry.plan().unwrap();
        assert_eq!(plan.batches().len(), 1);
        assert_eq!(plan.batches()[0].len(), 2);
    }

    #[test]
    fn dependencies_are_layered() {
        let mut registry = CheckRegistry::new();
        registry.register(check("c", &["b"]));
        registry.register(check("a", &[]));
        registry.register(check("b", &["a"]));

        let plan = registry.plan().unwrap();
        assert_eq!(plan.batches().len(), 3);
        assert_eq!(plan.batch_of("a"), Some(0));
        assert_eq!(plan.batch_of("b"), Some(1));
        assert_eq!(plan.batch_of("c"), Some(2));
    }

    #[test]
    fn diamond_dependencies_share_a_layer() {
        let mut registry = CheckRegistry::new();
        registry.register(check("root", &[]));
        registry.register(check("left", &["root"]));
        registry.register(check("right", &["root"]));
        registry.register(check("sink", &["left", "right"]));

        let plan = registry.plan().unwrap();
        assert_eq!(plan.batches().len(), 3);
        assert_eq!(plan.batch_of("left"), Some(1));
        assert_eq!(plan.batch_of("right"), Some(1));
        assert_eq!(plan.batch_of("sink"), Some(2));
    }

    #[test]
    fn layering_respects_every_edge() {
        let mut registry = CheckRegistry::new();
        registry.register(check("a", &[]));
        registry.register(check("b", &["a"]));
        registry.register(check("c", &["a", "b"]));
        registry.register(check("d", &["c"]));

        let plan = registry.plan().unwrap();
        for check in registry.checks() {
            for dependency in &check.metadata.depends_on {
                assert!(
                    plan.batch_of(dependency).unwrap() < plan.batch_of(check.id()).unwrap(),
                    "edge {} -> {} not layered",
                    dependency,
                    check.id()
                );
            }
        }
    }

    #[test]
    fn unknown_dependency_fails_planning() {
        let mut registry = CheckRegistry::new();
        registry.register(check("a", &["ghost"]));

        match registry.plan() {
            Err(PlanError::UnknownDependency { check, dependency }) => {
                assert_eq!(check, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected unknown dependency, got {:?}", other.map(|p| p.total_checks())),
        }
    }

    #[test]
    fn cycles_fail_planning() {
        let mut registry = CheckRegistry::new();
        registry.register(check("a", &["b"]));
        registry.register(check("b", &["a"]));
        registry.register(check("standalone", &[]));

        match registry.plan() {
            Err(PlanError::CyclicDependencies { remaining }) => {
                assert_eq!(remaining, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle error, got {:?}", other.map(|p| p.total_checks())),
        }
    }

    #[test]
    fn re_registration_replaces_in_place() {
        let mut registry = CheckRegistry::new();
        registry.register(check("a", &[]));
        registry.register(check("b", &[]));
        registry.register(check("a", &[]));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.checks()[0].id(), "a");
    }

    #[test]
    fn duplicate_dependency_edges_do_not_deadlock() {
        let mut registry = CheckRegistry::new();
        registry.register(check("a", &[]));
        registry.register(check("b", &["a", "a"]));

        let plan = registry.plan().unwrap();
        assert_eq!(plan.batch_of("b"), Some(1));
    }
}
