//! Resolves `%parameter%` placeholders throughout definitions.

use super::CompilerPass;
use super::visitor::{RecursivePass, VisitContext, process_container, walk_bindings, walk_definition, walk_value};
use crate::container::ContainerBuilder;
use crate::core::{DiError, Result};
use crate::definition::{Definition, Value};

/// Resolves placeholders in classes, factory classes, method names, arguments,
/// properties and binding values. `%%` escapes are kept.
#[derive(Debug, Default)]
pub struct ResolveParameterPlaceholdersPass;

impl ResolveParameterPlaceholdersPass {
    pub fn new() -> Self {
        Self
    }
}

/// Attach the service id to a parameter lookup failure.
fn attribute_to(error: DiError, service_id: &str) -> DiError {
    match error {
        DiError::ParameterNotFound {
            key,
            source_id: None,
            alternatives,
        } => DiError::ParameterNotFound {
            key,
            source_id: Some(service_id.to_string()),
            alternatives,
        },
        other => other,
    }
}

impl RecursivePass for ResolveParameterPlaceholdersPass {
    fn process_value(&mut self, value: Value, ctx: &mut VisitContext<'_>) -> Result<Value> {
        match value {
            Value::String(s) => ctx
                .container
                .parameters()
                .resolve_value(&Value::String(s))
                .map_err(|e| attribute_to(e, &ctx.current_id)),
            other => walk_value(self, other, ctx),
        }
    }

    fn process_definition(
        &mut self,
        mut definition: Definition,
        ctx: &mut VisitContext<'_>,
    ) -> Result<Definition> {
        let parameters = ctx.container.parameters();
        let service_id = ctx.current_id.clone();
        let resolve = |s: &str| parameters.resolve_string(s).map_err(|e| attribute_to(e, &service_id));

        if let Some(class) = &definition.class {
            definition.class = Some(resolve(class)?);
        }
        if let Some(factory) = definition.factory.as_mut() {
            if let Some(class) = &factory.class {
                factory.class = Some(resolve(class)?);
            }
            factory.method = resolve(&factory.method)?;
        }
        for call in &mut definition.calls {
            call.method = resolve(&call.method)?;
        }

        let mut definition = walk_definition(self, definition, ctx)?;
        definition.bindings = walk_bindings(self, definition.bindings, ctx)?;
        Ok(definition)
    }
}

impl CompilerPass for ResolveParameterPlaceholdersPass {
    fn name(&self) -> &'static str {
        "ResolveParameterPlaceholdersPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        process_container(self, container)
    }
}
