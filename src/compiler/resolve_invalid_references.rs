//! Applies the invalid-reference behaviour of references to missing services.

use indexmap::IndexMap;

use super::CompilerPass;
use super::visitor::{RecursivePass, VisitContext, process_container};
use crate::container::ContainerBuilder;
use crate::core::Result;
use crate::definition::{Definition, InvalidBehavior, Value};

/// For a reference whose target does not exist:
///
/// - `Null` behaviour replaces it with `null`.
/// - `Ignore` behaviour removes it: a direct constructor argument becomes `null` so
///   positions hold, a property is unset, a method call using it is dropped, and an
///   element of a collection is left out.
///
/// `Exception` references are left for the final check.
#[derive(Debug, Default)]
pub struct ResolveInvalidReferencesPass {
    removed: usize,
}

impl ResolveInvalidReferencesPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the value must be removed from its container.
    fn resolve(&mut self, value: Value, ctx: &mut VisitContext<'_>) -> Result<Option<Value>> {
        Ok(match value {
            Value::Reference(reference) if !ctx.container.has(&reference.id) => {
                match reference.invalid_behavior {
                    InvalidBehavior::Null => Some(Value::Null),
                    InvalidBehavior::Ignore => {
                        self.removed += 1;
                        None
                    }
                    InvalidBehavior::Exception => Some(Value::Reference(reference)),
                }
            }
            Value::List(items) => Some(Value::List(self.resolve_items(items, ctx)?)),
            Value::Iterator(items) => Some(Value::Iterator(self.resolve_items(items, ctx)?)),
            Value::Map(entries) => {
                let mut kept = IndexMap::with_capacity(entries.len());
                for (key, item) in entries {
                    if let Some(item) = self.resolve(item, ctx)? {
                        kept.insert(key, item);
                    }
                }
                Some(Value::Map(kept))
            }
            Value::ServiceClosure(inner) => Some(match self.resolve(*inner, ctx)? {
                Some(inner) => Value::ServiceClosure(Box::new(inner)),
                None => Value::Null,
            }),
            Value::Inline(definition) => {
                let was_root = ctx.is_root;
                ctx.is_root = false;
                let definition = self.process_definition(*definition, ctx);
                ctx.is_root = was_root;
                Some(Value::Inline(Box::new(definition?)))
            }
            other => Some(other),
        })
    }

    fn resolve_items(&mut self, items: Vec<Value>, ctx: &mut VisitContext<'_>) -> Result<Vec<Value>> {
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if let Some(item) = self.resolve(item, ctx)? {
                kept.push(item);
            }
        }
        Ok(kept)
    }
}

impl RecursivePass for ResolveInvalidReferencesPass {
    fn process_value(&mut self, value: Value, ctx: &mut VisitContext<'_>) -> Result<Value> {
        Ok(self.resolve(value, ctx)?.unwrap_or(Value::Null))
    }

    fn process_definition(
        &mut self,
        mut definition: Definition,
        ctx: &mut VisitContext<'_>,
    ) -> Result<Definition> {
        for value in definition.arguments.values_mut() {
            let current = std::mem::replace(value, Value::Null);
            *value = self.process_value(current, ctx)?;
        }

        let properties = std::mem::take(&mut definition.properties);
        for (name, value) in properties {
            if let Some(value) = self.resolve(value, ctx)? {
                definition.properties.insert(name, value);
            }
        }

        let calls = std::mem::take(&mut definition.calls);
        'calls: for mut call in calls {
            for value in call.arguments.values_mut() {
                let current = std::mem::replace(value, Value::Null);
                match self.resolve(current, ctx)? {
                    Some(resolved) => *value = resolved,
                    None => continue 'calls,
                }
            }
            definition.calls.push(call);
        }

        Ok(definition)
    }
}

impl CompilerPass for ResolveInvalidReferencesPass {
    fn name(&self) -> &'static str {
        "ResolveInvalidReferencesPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        self.removed = 0;
        process_container(self, container)?;
        container.log(self.name(), format!("{} ignored references removed", self.removed));
        Ok(())
    }
}
