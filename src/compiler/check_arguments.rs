//! Checks that argument lists can be passed positionally.

use super::CompilerPass;
use super::visitor::{RecursivePass, VisitContext, process_container, walk_definition};
use crate::container::ContainerBuilder;
use crate::core::{DiError, Result};
use crate::definition::{Arguments, Definition};

/// After named arguments and bindings are resolved, constructor and method-call
/// arguments must be keyed by position without holes.
#[derive(Debug, Default)]
pub struct CheckArgumentsValidityPass;

impl CheckArgumentsValidityPass {
    pub fn new() -> Self {
        Self
    }
}

fn check(arguments: &Arguments, what: &str, service_id: &str) -> Result<()> {
    let invalid = |reason: String| DiError::InvalidArguments {
        service_id: service_id.to_string(),
        reason,
    };

    if let Some(name) = arguments.named_keys().first() {
        return Err(invalid(format!(
            "{what}: argument \"{name}\" does not match any parameter. Check your service definition."
        )));
    }
    if let Some(missing) = arguments.first_gap() {
        return Err(invalid(format!(
            "{what}: argument {missing} must be defined before argument {}. Check your service definition.",
            missing + 1
        )));
    }
    Ok(())
}

impl RecursivePass for CheckArgumentsValidityPass {
    fn process_definition(&mut self, definition: Definition, ctx: &mut VisitContext<'_>) -> Result<Definition> {
        let service_id = ctx.current_id.as_str();
        check(&definition.arguments, "constructor", service_id)?;
        for call in &definition.calls {
            check(&call.arguments, &format!("method call \"{}\"", call.method), service_id)?;
        }
        walk_definition(self, definition, ctx)
    }
}

impl CompilerPass for CheckArgumentsValidityPass {
    fn name(&self) -> &'static str {
        "CheckArgumentsValidityPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        process_container(self, container)
    }
}
