//! Surfaces errors recorded on definitions that survived removal.

use super::CompilerPass;
use super::visitor::{RecursivePass, VisitContext, process_container, walk_definition};
use crate::container::ContainerBuilder;
use crate::core::{DiError, Result};
use crate::definition::Definition;

/// Passes record problems on definitions instead of failing right away, since the
/// definition may turn out to be unused. Any definition still present at this point,
/// root or inline, fails with its first recorded error.
#[derive(Debug, Default)]
pub struct DefinitionErrorExceptionPass;

impl DefinitionErrorExceptionPass {
    pub fn new() -> Self {
        Self
    }
}

impl RecursivePass for DefinitionErrorExceptionPass {
    fn process_definition(&mut self, definition: Definition, ctx: &mut VisitContext<'_>) -> Result<Definition> {
        if let Some(error) = definition.errors.first() {
            return Err(DiError::InvalidService {
                service_id: ctx.current_id.clone(),
                reason: error.clone(),
            });
        }
        walk_definition(self, definition, ctx)
    }
}

impl CompilerPass for DefinitionErrorExceptionPass {
    fn name(&self) -> &'static str {
        "DefinitionErrorExceptionPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        process_container(self, container)
    }
}
