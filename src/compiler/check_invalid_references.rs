//! Final check that every required reference resolves.

use super::CompilerPass;
use super::visitor::{RecursivePass, VisitContext, process_container, walk_value};
use crate::container::ContainerBuilder;
use crate::core::Result;
use crate::definition::{InvalidBehavior, Value};

/// Fails on the first reference with the default behaviour whose target does not
/// exist, naming the referencing service and suggesting close ids.
#[derive(Debug, Default)]
pub struct CheckExceptionOnInvalidReferenceBehaviorPass;

impl CheckExceptionOnInvalidReferenceBehaviorPass {
    pub fn new() -> Self {
        Self
    }
}

impl RecursivePass for CheckExceptionOnInvalidReferenceBehaviorPass {
    fn process_value(&mut self, value: Value, ctx: &mut VisitContext<'_>) -> Result<Value> {
        if let Value::Reference(reference) = &value
            && reference.invalid_behavior == InvalidBehavior::Exception
            && !ctx.container.has(&reference.id)
        {
            return Err(ctx.container.service_not_found(&reference.id, Some(&ctx.current_id)));
        }
        walk_value(self, value, ctx)
    }
}

impl CompilerPass for CheckExceptionOnInvalidReferenceBehaviorPass {
    fn name(&self) -> &'static str {
        "CheckExceptionOnInvalidReferenceBehaviorPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        process_container(self, container)
    }
}
