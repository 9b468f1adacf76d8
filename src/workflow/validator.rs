//! Validation strategies for workflow definitions.

use std::collections::{HashMap, HashSet};

use super::{WorkflowDefinition, WorkflowError};
use crate::constants::{SINGLE_STATE_MARKING_STORES, STATE_MACHINE_TYPE};

/// Checks a workflow definition against the rules of one marking strategy.
pub trait DefinitionValidator: Send + Sync {
    fn validate(&self, definition: &WorkflowDefinition, name: &str) -> Result<(), WorkflowError>;
}

/// Transitions leaving a place must have distinct names.
fn check_unique_names(definition: &WorkflowDefinition, name: &str) -> Result<(), WorkflowError> {
    let mut seen: HashMap<&str, HashSet<&str>> = HashMap::new();
    for transition in &definition.transitions {
        for from in &transition.froms {
            if !seen.entry(from.as_str()).or_default().insert(transition.name.as_str()) {
                return Err(WorkflowError::DuplicateTransition {
                    transition: transition.name.clone(),
                    place: from.clone(),
                    workflow: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Workflows, which may hold several places at once unless `single_place` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowValidator {
    single_place: bool,
}

impl WorkflowValidator {
    pub fn new(single_place: bool) -> Self {
        Self { single_place }
    }
}

impl DefinitionValidator for WorkflowValidator {
    fn validate(&self, definition: &WorkflowDefinition, name: &str) -> Result<(), WorkflowError> {
        check_unique_names(definition, name)?;

        if !self.single_place {
            return Ok(());
        }

        for transition in &definition.transitions {
            if transition.tos.len() > 1 {
                return Err(WorkflowError::TooManyOutputs {
                    workflow: name.to_string(),
                    transition: transition.name.clone(),
                    count: transition.tos.len(),
                });
            }
        }
        if definition.initial_places.len() > 1 {
            return Err(WorkflowError::TooManyInitialPlaces {
                workflow: name.to_string(),
                count: definition.initial_places.len(),
            });
        }
        Ok(())
    }
}

/// State machines: one input, one output per transition and a single initial place.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachineValidator;

impl DefinitionValidator for StateMachineValidator {
    fn validate(&self, definition: &WorkflowDefinition, name: &str) -> Result<(), WorkflowError> {
        for transition in &definition.transitions {
            for (direction, count) in [("input", transition.froms.len()), ("output", transition.tos.len())] {
                if count != 1 {
                    return Err(WorkflowError::StateMachineArity {
                        direction,
                        transition: transition.name.clone(),
                        workflow: name.to_string(),
                        count,
                    });
                }
            }
        }

        check_unique_names(definition, name)?;

        if definition.initial_places.len() > 1 {
            return Err(WorkflowError::TooManyInitialPlaces {
                workflow: name.to_string(),
                count: definition.initial_places.len(),
            });
        }
        Ok(())
    }
}

/// How a workflow is validated, picked from its tag's `type` and `marking_store`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationStrategy {
    /// `type: state_machine`, whatever the marking store.
    StateMachine,
    /// A workflow whose marking store holds a single place (`scalar`, `single_state`).
    SinglePlaceWorkflow,
    Workflow,
}

impl ValidationStrategy {
    pub fn for_tag(workflow_type: &str, marking_store: &str) -> Self {
        if workflow_type == STATE_MACHINE_TYPE {
            Self::StateMachine
        } else if SINGLE_STATE_MARKING_STORES.contains(&marking_store) {
            Self::SinglePlaceWorkflow
        } else {
            Self::Workflow
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::StateMachine => "state_machine",
            Self::SinglePlaceWorkflow => "single_place_workflow",
            Self::Workflow => "workflow",
        }
    }

    /// A fresh validator for this strategy.
    pub fn validator(self) -> Box<dyn DefinitionValidator> {
        match self {
            Self::StateMachine => Box::new(StateMachineValidator),
            Self::SinglePlaceWorkflow => Box::new(WorkflowValidator::new(true)),
            Self::Workflow => Box::new(WorkflowValidator::new(false)),
        }
    }
}
