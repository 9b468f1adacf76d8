//! Workflow and state-machine definitions checked at compile time.
//!
//! A workflow is a set of places, transitions between them and initial places.
//! [`WorkflowDefinition::from_service`] reads one from the arguments of a tagged
//! service definition; the validators in [`validator`] check it against the rules of
//! its marking strategy.

pub mod validator;

pub use validator::{DefinitionValidator, StateMachineValidator, ValidationStrategy, WorkflowValidator};

use serde::Serialize;
use thiserror::Error;

use crate::container::ContainerBuilder;
use crate::definition::{Definition, Value};

/// Why a workflow definition was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Place \"{place}\" cannot be the initial place as it does not exist.")]
    UnknownInitialPlace { place: String },

    #[error("Place \"{place}\" referenced in transition \"{transition}\" does not exist.")]
    UnknownTransitionPlace { place: String, transition: String },

    #[error(
        "All transitions for a place must have an unique name. Multiple transitions named \"{transition}\" where found for place \"{place}\" in workflow \"{workflow}\"."
    )]
    DuplicateTransition {
        transition: String,
        place: String,
        workflow: String,
    },

    #[error(
        "A transition in StateMachine can only have one {direction}. But the transition \"{transition}\" in StateMachine \"{workflow}\" has {count} {direction}s."
    )]
    StateMachineArity {
        direction: &'static str,
        transition: String,
        workflow: String,
        count: usize,
    },

    #[error(
        "The marking store of workflow \"{workflow}\" cannot store many places. But the transition \"{transition}\" has too many output ({count}). Only one is accepted."
    )]
    TooManyOutputs {
        workflow: String,
        transition: String,
        count: usize,
    },

    #[error(
        "The marking store of workflow \"{workflow}\" cannot store many places. But the definition has {count} initial places. Only one is supported."
    )]
    TooManyInitialPlaces { workflow: String, count: usize },

    #[error("Malformed workflow definition: {reason}")]
    Malformed { reason: String },
}

/// A named move from some places to others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub name: String,
    pub froms: Vec<String>,
    pub tos: Vec<String>,
}

impl Transition {
    pub fn new(
        name: impl Into<String>,
        froms: impl IntoIterator<Item = impl Into<String>>,
        tos: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            froms: froms.into_iter().map(Into::into).collect(),
            tos: tos.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowDefinition {
    pub places: Vec<String>,
    pub transitions: Vec<Transition>,
    pub initial_places: Vec<String>,
}

impl WorkflowDefinition {
    /// Build a definition, checking that every place referenced is declared.
    pub fn new(
        places: Vec<String>,
        transitions: Vec<Transition>,
        initial_places: Vec<String>,
    ) -> Result<Self, WorkflowError> {
        for place in &initial_places {
            if !places.contains(place) {
                return Err(WorkflowError::UnknownInitialPlace { place: place.clone() });
            }
        }
        for transition in &transitions {
            for place in transition.froms.iter().chain(&transition.tos) {
                if !places.contains(place) {
                    return Err(WorkflowError::UnknownTransitionPlace {
                        place: place.clone(),
                        transition: transition.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            places,
            transitions,
            initial_places,
        })
    }

    /// Read a definition from a service's arguments: 0 places, 1 transitions,
    /// 2 initial places. Transitions may be inline definitions or references to
    /// definitions (arguments name, froms, tos), or maps with `name`, `from`, `to`.
    pub fn from_service(container: &ContainerBuilder, definition: &Definition) -> Result<Self, WorkflowError> {
        let places = definition
            .arguments
            .get_index(0)
            .map(|v| string_list(v, "places"))
            .transpose()?
            .unwrap_or_default();

        let transitions = match definition.arguments.get_index(1) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::List(items)) => items
                .iter()
                .map(|item| transition(container, item))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(malformed(format!(
                    "transitions must be a list, {} given",
                    other.type_name()
                )));
            }
        };

        let initial_places = match definition.arguments.get_index(2) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => string_list(value, "initial places")?,
        };

        Self::new(places, transitions, initial_places)
    }
}

fn malformed(reason: String) -> WorkflowError {
    WorkflowError::Malformed { reason }
}

/// A string or a list of strings.
fn string_list(value: &Value, what: &str) -> Result<Vec<String>, WorkflowError> {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| {
                item.to_interpolated()
                    .ok_or_else(|| malformed(format!("{what} must be strings, {} given", item.type_name())))
            })
            .collect(),
        Value::Map(entries) => Ok(entries.keys().cloned().collect()),
        other => other
            .to_interpolated()
            .map(|s| vec![s])
            .ok_or_else(|| malformed(format!("{what} must be a list, {} given", other.type_name()))),
    }
}

fn transition(container: &ContainerBuilder, value: &Value) -> Result<Transition, WorkflowError> {
    match value {
        Value::Inline(definition) => transition_from_definition(definition),
        Value::Reference(reference) => {
            let definition = container
                .find_definition(&reference.id)
                .map_err(|e| malformed(e.to_string()))?;
            transition_from_definition(definition)
        }
        Value::Map(entries) => {
            let field = |key: &str| {
                entries
                    .get(key)
                    .ok_or_else(|| malformed(format!("transition is missing \"{key}\"")))
            };
            let name = field("name")?
                .to_interpolated()
                .ok_or_else(|| malformed("transition name must be a string".to_string()))?;
            Ok(Transition {
                name,
                froms: string_list(field("from")?, "transition places")?,
                tos: string_list(field("to")?, "transition places")?,
            })
        }
        other => Err(malformed(format!(
            "a transition must be a definition, a reference or a map, {} given",
            other.type_name()
        ))),
    }
}

fn transition_from_definition(definition: &Definition) -> Result<Transition, WorkflowError> {
    let argument = |index: usize| {
        definition
            .arguments
            .get_index(index)
            .ok_or_else(|| malformed(format!("transition definition is missing argument {index}")))
    };
    let name = argument(0)?
        .to_interpolated()
        .ok_or_else(|| malformed("transition name must be a string".to_string()))?;

    Ok(Transition {
        name,
        froms: string_list(argument(1)?, "transition places")?,
        tos: string_list(argument(2)?, "transition places")?,
    })
}
