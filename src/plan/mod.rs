//! Plan validation: filtering a raw planner output against the task registry.
//!
//! Unknown identifiers are dropped with a warning; the run proceeds with the
//! known subset. A plan with no known identifiers fails before any execution.

use tracing::{debug, warn};

use crate::error::EmptyPlanError;
use crate::registry::{TaskDescriptor, TaskRegistry};

/// An ordered, non-empty sequence of resolved task descriptors.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    steps: Vec<TaskDescriptor>,
}

impl ValidatedPlan {
    /// The validated steps, in plan order.
    pub fn steps(&self) -> &[TaskDescriptor] {
        &self.steps
    }

    /// Number of steps in the plan.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// A validated plan is non-empty by construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The first step of the plan.
    pub fn first(&self) -> &TaskDescriptor {
        &self.steps[0]
    }
}

/// Validates a raw plan against the registry, preserving order.
///
/// Identifiers unknown to the registry are dropped and reported via a single
/// warning; duplicates of known identifiers are kept.
///
/// # Errors
///
/// Returns `EmptyPlanError` when the raw plan is empty or none of its
/// entries are known.
pub fn validate(raw_plan: &[String], registry: &TaskRegistry) -> Result<ValidatedPlan, EmptyPlanError> {
    if raw_plan.is_empty() {
        return Err(EmptyPlanError::NoSteps);
    }

    let mut steps = Vec::with_capacity(raw_plan.len());
    let mut dropped = Vec::new();

    for id in raw_plan {
        match registry.get(id) {
            Some(descriptor) => steps.push(descriptor.clone()),
            None => dropped.push(id.as_str()),
        }
    }

    if !dropped.is_empty() {
        warn!(dropped = %dropped.join(", "), "Ignoring unknown steps from plan");
    }

    if steps.is_empty() {
        return Err(EmptyPlanError::NoKnownSteps(dropped.join(", ")));
    }

    debug!(
        steps = %steps.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(" -> "),
        "Plan validated"
    );

    Ok(ValidatedPlan { steps })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_keeps_order() {
        let registry = TaskRegistry::builtin();
        let raw = plan(&["summarizer-service", "translator-service"]);

        let validated = validate(&raw, &registry).unwrap();
        assert_eq!(validated.len(), 2);
        assert_eq!(validated.steps()[0].id, "summarizer-service");
        assert_eq!(validated.steps()[1].id, "translator-service");
    }

    #[test]
    fn test_validate_drops_unknown() {
        let registry = TaskRegistry::builtin();
        let raw = plan(&["summarizer-service", "mystery-service", "translator-service"]);

        let validated = validate(&raw, &registry).unwrap();
        assert_eq!(validated.len(), 2);
        assert_eq!(validated.steps()[0].id, "summarizer-service");
        assert_eq!(validated.steps()[1].id, "translator-service");
    }

    #[test]
    fn test_validate_keeps_duplicates() {
        let registry = TaskRegistry::builtin();
        let raw = plan(&["summarizer-service", "summarizer-service"]);

        let validated = validate(&raw, &registry).unwrap();
        assert_eq!(validated.len(), 2);
    }

    #[test]
    fn test_validate_empty_plan() {
        let registry = TaskRegistry::builtin();
        let err = validate(&[], &registry).unwrap_err();
        assert!(matches!(err, EmptyPlanError::NoSteps));
    }

    #[test]
    fn test_validate_all_unknown() {
        let registry = TaskRegistry::builtin();
        let raw = plan(&["mystery-service", "other-service"]);

        let err = validate(&raw, &registry).unwrap_err();
        match err {
            EmptyPlanError::NoKnownSteps(dropped) => {
                assert!(dropped.contains("mystery-service"));
                assert!(dropped.contains("other-service"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
