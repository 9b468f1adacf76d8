//! Points references and alias chains straight at definitions.

use super::CompilerPass;
use super::visitor::{RecursivePass, VisitContext, process_container, walk_bindings, walk_definition, walk_value};
use crate::container::ContainerBuilder;
use crate::core::Result;
use crate::definition::{Definition, Reference, Value};

/// Rewrites every reference to an alias into a reference to the alias's final
/// target, keeping the invalid-reference behaviour. Alias chains are collapsed so
/// each alias targets an id that is not itself an alias. A loop of aliases fails
/// with [`crate::core::DiError::CircularAlias`].
#[derive(Debug, Default)]
pub struct ResolveReferencesToAliasesPass;

impl ResolveReferencesToAliasesPass {
    pub fn new() -> Self {
        Self
    }
}

impl RecursivePass for ResolveReferencesToAliasesPass {
    fn process_value(&mut self, value: Value, ctx: &mut VisitContext<'_>) -> Result<Value> {
        match value {
            Value::Reference(reference) if ctx.container.has_alias(&reference.id) => {
                let target = ctx.container.resolve_alias_target(&reference.id)?;
                Ok(Value::Reference(Reference::with_behavior(target, reference.invalid_behavior)))
            }
            other => walk_value(self, other, ctx),
        }
    }

    fn process_definition(
        &mut self,
        definition: Definition,
        ctx: &mut VisitContext<'_>,
    ) -> Result<Definition> {
        let mut definition = walk_definition(self, definition, ctx)?;
        definition.bindings = walk_bindings(self, definition.bindings, ctx)?;
        Ok(definition)
    }
}

impl CompilerPass for ResolveReferencesToAliasesPass {
    fn name(&self) -> &'static str {
        "ResolveReferencesToAliasesPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        let mut collapsed = Vec::new();
        for (id, alias) in container.aliases() {
            let target = container.resolve_alias_target(id)?;
            if target != alias.target() {
                collapsed.push((id.clone(), target));
            }
        }
        for (id, target) in collapsed {
            if let Some(alias) = container.alias_mut(&id) {
                alias.set_target(target);
            }
        }

        process_container(self, container)
    }
}
