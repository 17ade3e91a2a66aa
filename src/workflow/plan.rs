//! # Workflow Plan
//!
//! Builds the dependency-ordered execution plan for a run. Planning problems
//! (duplicate names, unknown or cyclic dependencies) are fatal here, before
//! any step executes, so a bad plan can never produce partial side effects.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::step::WorkflowStep;

/// Fatal plan-construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("duplicate step name: {0}")]
    DuplicateStep(String),

    #[error("step {step} depends on unknown step: {dependency}")]
    UnknownDependency { step: String, dependency: String },

    #[error("cyclic dependency involving steps: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),
}

/// Ordered execution plan. Steps are stored in topological order; steps with
/// no dependency relationship keep their declaration order, so execution is
/// stable and deterministic.
#[derive(Debug, Clone)]
pub struct WorkflowPlan {
    steps: Vec<WorkflowStep>,
    index_by_name: HashMap<String, usize>,
}

impl WorkflowPlan {
    /// Validate the step set and produce a topological ordering.
    pub fn build(steps: Vec<WorkflowStep>) -> Result<Self, PlanError> {
        let mut declared: HashSet<&str> = HashSet::new();
        for step in &steps {
            if !declared.insert(step.name.as_str()) {
                return Err(PlanError::DuplicateStep(step.name.clone()));
            }
        }

        for step in &steps {
            for dep in &step.depends_on {
                if !declared.contains(dep.as_str()) {
                    return Err(PlanError::UnknownDependency {
                        step: step.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Stable Kahn: each round emits the declaration-earliest step whose
        // dependencies are all emitted.
        let mut emitted: HashSet<&str> = HashSet::new();
        let mut order: Vec<usize> = Vec::with_capacity(steps.len());
        while order.len() < steps.len() {
            let next = steps.iter().enumerate().find(|(_, step)| {
                !emitted.contains(step.name.as_str())
                    && step
                        .depends_on
                        .iter()
                        .all(|dep| emitted.contains(dep.as_str()))
            });
            match next {
                Some((idx, step)) => {
                    emitted.insert(step.name.as_str());
                    order.push(idx);
                }
                None => {
                    let mut cycle: Vec<String> = steps
                        .iter()
                        .filter(|s| !emitted.contains(s.name.as_str()))
                        .map(|s| s.name.clone())
                        .collect();
                    cycle.sort();
                    return Err(PlanError::CyclicDependency(cycle));
                }
            }
        }

        let ordered: Vec<WorkflowStep> = order.into_iter().map(|idx| steps[idx].clone()).collect();
        let index_by_name = ordered
            .iter()
            .enumerate()
            .map(|(idx, step)| (step.name.clone(), idx))
            .collect();

        Ok(Self {
            steps: ordered,
            index_by_name,
        })
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&WorkflowStep> {
        self.index_by_name.get(name).map(|idx| &self.steps[*idx])
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All steps that transitively depend on `name`, in execution order.
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let mut affected: HashSet<&str> = HashSet::new();
        affected.insert(name);
        let mut dependents = Vec::new();
        for step in &self.steps {
            if step
                .depends_on
                .iter()
                .any(|dep| affected.contains(dep.as_str()))
            {
                affected.insert(step.name.as_str());
                dependents.push(step.name.clone());
            }
        }
        dependents
    }
}
