// crates/statecheck-core/src/runtime/registry.rs
// ============================================================================
// Module: Statecheck Rule Registry
// Description: Load-time validation, dependency ordering, and subset planning.
// Purpose: Turn declared expectations into a deterministic execution plan.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! The registry validates expectations once per run: identifiers are unique,
//! probe references resolve, predicates compile, dependencies exist, and the
//! dependency graph is acyclic. It then fixes a topological order in which
//! independent expectations keep their declaration order.
//!
//! ## Invariants
//! - A registry only exists for an acyclic dependency graph.
//! - Plans never contain an expectation without its dependencies.
//! - Excluded expectations are absent from plans, never marked SKIP.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::HashMap;
use std::collections::HashSet;

use thiserror::Error;

use crate::core::Expectation;
use crate::core::ExpectationId;
use crate::core::Predicate;
use crate::core::RunConfig;
use crate::core::RunSettings;
use crate::core::SettingsError;
use crate::core::SubsetSelection;
use crate::core::expectation::PredicateError;
use crate::interfaces::Probe;
use crate::interfaces::ProbeError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors raised while loading or planning expectations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An expectation id is blank.
    #[error("expectation id must not be empty")]
    EmptyId,
    /// Two expectations share an id.
    #[error("duplicate expectation id: {0}")]
    DuplicateId(ExpectationId),
    /// A dependency names an unknown expectation.
    #[error("expectation `{id}` depends on unknown expectation `{dependency}`")]
    UnknownDependency {
        /// Dependent expectation.
        id: ExpectationId,
        /// Missing dependency.
        dependency: ExpectationId,
    },
    /// The dependency graph contains a cycle.
    #[error("dependency cycle: {}", render_cycle(.0))]
    DependencyCycle(Vec<ExpectationId>),
    /// The probe reference was rejected.
    #[error("expectation `{id}`: {error}")]
    Probe {
        /// Offending expectation.
        id: ExpectationId,
        /// Probe validation error.
        error: ProbeError,
    },
    /// The predicate is malformed.
    #[error("expectation `{id}`: {error}")]
    Predicate {
        /// Offending expectation.
        id: ExpectationId,
        /// Predicate validation error.
        error: PredicateError,
    },
    /// Expectation text or probe parameters reference unknown variables.
    #[error("expectation `{id}`: {error}")]
    Interpolation {
        /// Offending expectation.
        id: ExpectationId,
        /// Interpolation error.
        error: SettingsError,
    },
    /// A subset tag selected nothing.
    #[error("subset `{0}` selects no expectations")]
    EmptySubset(String),
    /// An explicitly selected id does not exist.
    #[error("unknown expectation in subset: {0}")]
    UnknownSelection(ExpectationId),
    /// A subset selects an expectation but excludes one of its dependencies.
    #[error("subset includes `{id}` but excludes its dependency `{dependency}`")]
    SubsetMissingDependency {
        /// Selected expectation.
        id: ExpectationId,
        /// Excluded dependency.
        dependency: ExpectationId,
    },
}

/// Renders a cycle as `a -> b -> a`.
fn render_cycle(cycle: &[ExpectationId]) -> String {
    cycle.iter().map(ExpectationId::as_str).collect::<Vec<_>>().join(" -> ")
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Validated, ordered expectations for one run.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    /// Expectations in declaration order, parameters interpolated.
    expectations: Vec<Expectation>,
    /// Declaration indices in execution order.
    order: Vec<usize>,
}

impl RuleRegistry {
    /// Validates expectations and fixes the execution order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for duplicate or empty ids, rejected probe
    /// references, malformed predicates, unknown dependencies, or cycles.
    pub fn load(
        expectations: Vec<Expectation>,
        config: &RunConfig,
        probe: &dyn Probe,
    ) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(expectations.len());
        let mut resolved = Vec::with_capacity(expectations.len());
        for (position, mut expectation) in expectations.into_iter().enumerate() {
            if expectation.id.as_str().trim().is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if index.insert(expectation.id.clone(), position).is_some() {
                return Err(RegistryError::DuplicateId(expectation.id));
            }
            interpolate(&mut expectation, &config.variables).map_err(|error| {
                RegistryError::Interpolation {
                    id: expectation.id.clone(),
                    error,
                }
            })?;
            expectation.predicate.validate().map_err(|error| RegistryError::Predicate {
                id: expectation.id.clone(),
                error,
            })?;
            probe.validate(&expectation.probe).map_err(|error| RegistryError::Probe {
                id: expectation.id.clone(),
                error,
            })?;
            resolved.push(expectation);
        }

        let mut dependencies = Vec::with_capacity(resolved.len());
        for expectation in &resolved {
            let mut edges = Vec::with_capacity(expectation.depends_on.len());
            for dependency in &expectation.depends_on {
                let Some(&target) = index.get(dependency) else {
                    return Err(RegistryError::UnknownDependency {
                        id: expectation.id.clone(),
                        dependency: dependency.clone(),
                    });
                };
                if !edges.contains(&target) {
                    edges.push(target);
                }
            }
            dependencies.push(edges);
        }

        let order = topological_order(&dependencies).map_err(|cycle| {
            RegistryError::DependencyCycle(
                cycle.into_iter().map(|position| resolved[position].id.clone()).collect(),
            )
        })?;
        Ok(Self {
            expectations: resolved,
            order,
        })
    }

    /// Restricts the execution order to a subset.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the subset selects nothing, names an
    /// unknown id, or excludes a dependency of a selected expectation.
    pub fn plan(&self, subset: &SubsetSelection) -> Result<ExecutionPlan, RegistryError> {
        if let SubsetSelection::Ids(ids) = subset
            && let Some(unknown) =
                ids.iter().find(|id| !self.expectations.iter().any(|exp| &exp.id == *id))
        {
            return Err(RegistryError::UnknownSelection(unknown.clone()));
        }
        let selected: HashSet<&ExpectationId> = self
            .expectations
            .iter()
            .filter(|expectation| subset.includes(expectation))
            .map(|expectation| &expectation.id)
            .collect();
        if selected.is_empty() {
            return Err(RegistryError::EmptySubset(subset.label()));
        }
        let mut checks = Vec::with_capacity(selected.len());
        for &position in &self.order {
            let expectation = &self.expectations[position];
            if !selected.contains(&expectation.id) {
                continue;
            }
            if let Some(dependency) =
                expectation.depends_on.iter().find(|dependency| !selected.contains(dependency))
            {
                return Err(RegistryError::SubsetMissingDependency {
                    id: expectation.id.clone(),
                    dependency: dependency.clone(),
                });
            }
            checks.push(expectation.clone());
        }
        Ok(ExecutionPlan {
            subset: subset.label(),
            checks,
        })
    }
}

// ============================================================================
// SECTION: Execution Plan
// ============================================================================

/// Ordered checks selected for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    /// Subset label.
    pub subset: String,
    /// Checks in execution order.
    pub checks: Vec<Expectation>,
}

impl ExecutionPlan {
    /// Number of checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns true when the plan holds no checks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Groups plan positions into dependency waves.
    ///
    /// Every dependency of a check sits in an earlier wave, so checks within a
    /// wave are mutually independent. Positions keep plan order inside a wave.
    #[must_use]
    pub fn waves(&self) -> Vec<Vec<usize>> {
        let positions: HashMap<&ExpectationId, usize> =
            self.checks.iter().enumerate().map(|(position, check)| (&check.id, position)).collect();
        let mut levels = vec![0_usize; self.checks.len()];
        for (position, check) in self.checks.iter().enumerate() {
            let level = check
                .depends_on
                .iter()
                .filter_map(|dependency| positions.get(dependency))
                .map(|&dependency| levels[dependency] + 1)
                .max()
                .unwrap_or(0);
            levels[position] = level;
        }
        let depth = levels.iter().copied().max().map_or(0, |max| max + 1);
        let mut waves = vec![Vec::new(); depth];
        for (position, level) in levels.into_iter().enumerate() {
            waves[level].push(position);
        }
        waves
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Substitutes `${key}` references in the description, probe params,
/// expected operands, match patterns, and remediation text.
fn interpolate(expectation: &mut Expectation, variables: &RunSettings) -> Result<(), SettingsError> {
    expectation.description = variables.interpolate(&expectation.description)?;
    if let Some(params) = &expectation.probe.params {
        expectation.probe.params = Some(variables.interpolate_value(params)?);
    }
    match &mut expectation.predicate {
        Predicate::FieldEquals {
            expected,
            ..
        }
        | Predicate::FieldCompare {
            expected,
            ..
        } => {
            *expected = variables.interpolate_value(expected)?;
        }
        Predicate::FieldMatches {
            pattern,
            ..
        } => {
            *pattern = variables.interpolate(pattern)?;
        }
        Predicate::Exists
        | Predicate::Absent
        | Predicate::CountAtLeast {
            ..
        }
        | Predicate::CountEquals {
            ..
        }
        | Predicate::AllReady {
            ..
        } => {}
    }
    if let Some(remediation) = &expectation.remediation {
        expectation.remediation = Some(variables.interpolate(remediation)?);
    }
    Ok(())
}

/// Kahn's algorithm preferring the lowest declaration index among ready nodes.
///
/// `dependencies[i]` lists the nodes `i` depends on. Returns the cycle path
/// (first node repeated at the end) when the graph is cyclic.
fn topological_order(dependencies: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let count = dependencies.len();
    let mut pending = vec![0_usize; count];
    let mut dependents = vec![Vec::new(); count];
    for (node, edges) in dependencies.iter().enumerate() {
        pending[node] = edges.len();
        for &dependency in edges {
            dependents[dependency].push(node);
        }
    }
    let mut ready: BinaryHeap<Reverse<usize>> =
        (0 .. count).filter(|&node| pending[node] == 0).map(Reverse).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &dependent in &dependents[node] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }
    if order.len() == count {
        return Ok(order);
    }
    Err(find_cycle(dependencies, &pending))
}

/// Walks unresolved dependencies from the lowest unresolved node until a node repeats.
fn find_cycle(dependencies: &[Vec<usize>], pending: &[usize]) -> Vec<usize> {
    let Some(start) = (0 .. pending.len()).find(|&node| pending[node] > 0) else {
        return Vec::new();
    };
    let mut path = vec![start];
    let mut seen = HashMap::from([(start, 0_usize)]);
    let mut current = start;
    loop {
        let Some(&next) = dependencies[current].iter().find(|&&dependency| pending[dependency] > 0)
        else {
            return path;
        };
        if let Some(&first) = seen.get(&next) {
            let mut cycle = path.split_off(first);
            cycle.push(next);
            return cycle;
        }
        seen.insert(next, path.len());
        path.push(next);
        current = next;
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn ties_keep_declaration_order() {
        let order = topological_order(&[vec![2], vec![], vec![], vec![1]]).unwrap();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn cycle_path_is_closed() {
        let cycle = topological_order(&[vec![], vec![2], vec![3], vec![1]]).unwrap_err();
        assert_eq!(cycle, vec![1, 2, 3, 1]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let cycle = topological_order(&[vec![0]]).unwrap_err();
        assert_eq!(cycle, vec![0, 0]);
    }

    #[test]
    fn cycle_renders_with_arrows() {
        let err = RegistryError::DependencyCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }
}
