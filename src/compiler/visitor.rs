//! Recursive traversal of definitions and argument trees.
//!
//! A pass implementing [`RecursivePass`] overrides [`RecursivePass::process_value`]
//! and/or [`RecursivePass::process_definition`] for the nodes it cares about and calls
//! back into [`walk_value`]/[`walk_definition`] to keep descending. [`process_container`]
//! runs a pass over every definition of a container, in registration order, and writes
//! the transformed definitions back.

use crate::container::ContainerBuilder;
use crate::core::Result;
use crate::definition::{ArgumentKey, Arguments, Binding, Definition, Value};
use indexmap::IndexMap;

/// Where the traversal currently is.
pub struct VisitContext<'a> {
    /// The container being compiled, as it was before the current root definition
    /// started being processed.
    pub container: &'a ContainerBuilder,
    /// Id of the root definition being visited.
    pub current_id: String,
    /// True while visiting the root definition itself, false inside inline definitions.
    pub is_root: bool,
    /// Location segments from the root definition down to the current node.
    path: Vec<String>,
}

impl<'a> VisitContext<'a> {
    pub fn root(container: &'a ContainerBuilder, id: &str) -> Self {
        Self {
            container,
            current_id: id.to_string(),
            is_root: true,
            path: Vec::new(),
        }
    }

    /// Human readable location of the current node, such as `calls[0].setLogger[0]`.
    pub fn location(&self) -> String {
        self.path.concat()
    }

    fn enter(&mut self, segment: String) {
        self.path.push(segment);
    }

    fn leave(&mut self) {
        self.path.pop();
    }
}

/// A pass that visits definitions and the values nested inside them.
///
/// Both hooks default to plain descent, so an implementation only overrides the one
/// it needs. Overrides must call the matching `walk_*` function to keep visiting
/// children.
pub trait RecursivePass {
    fn process_value(&mut self, value: Value, ctx: &mut VisitContext<'_>) -> Result<Value> {
        walk_value(self, value, ctx)
    }

    fn process_definition(
        &mut self,
        definition: Definition,
        ctx: &mut VisitContext<'_>,
    ) -> Result<Definition> {
        walk_definition(self, definition, ctx)
    }
}

/// Descend into the children of `value`.
pub fn walk_value<P: RecursivePass + ?Sized>(
    pass: &mut P,
    value: Value,
    ctx: &mut VisitContext<'_>,
) -> Result<Value> {
    Ok(match value {
        Value::List(items) => Value::List(walk_items(pass, items, ctx)?),
        Value::Iterator(items) => Value::Iterator(walk_items(pass, items, ctx)?),
        Value::Map(entries) => {
            let mut walked = IndexMap::with_capacity(entries.len());
            for (key, item) in entries {
                ctx.enter(format!("[{key}]"));
                let item = pass.process_value(item, ctx);
                ctx.leave();
                walked.insert(key, item?);
            }
            Value::Map(walked)
        }
        Value::ServiceClosure(inner) => {
            ctx.enter(".closure".to_string());
            let inner = pass.process_value(*inner, ctx);
            ctx.leave();
            Value::ServiceClosure(Box::new(inner?))
        }
        Value::Inline(definition) => {
            let was_root = ctx.is_root;
            ctx.is_root = false;
            ctx.enter(".inline".to_string());
            let definition = pass.process_definition(*definition, ctx);
            ctx.leave();
            ctx.is_root = was_root;
            Value::Inline(Box::new(definition?))
        }
        other => other,
    })
}

fn walk_items<P: RecursivePass + ?Sized>(
    pass: &mut P,
    items: Vec<Value>,
    ctx: &mut VisitContext<'_>,
) -> Result<Vec<Value>> {
    let mut walked = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        ctx.enter(format!("[{i}]"));
        let item = pass.process_value(item, ctx);
        ctx.leave();
        walked.push(item?);
    }
    Ok(walked)
}

/// Process every value of an argument list; `prefix` names the list in locations.
pub fn walk_arguments<P: RecursivePass + ?Sized>(
    pass: &mut P,
    arguments: Arguments,
    prefix: &str,
    ctx: &mut VisitContext<'_>,
) -> Result<Arguments> {
    let mut walked: Vec<(ArgumentKey, Value)> = Vec::with_capacity(arguments.len());
    for (key, value) in arguments.into_entries() {
        ctx.enter(format!("{prefix}[{key}]"));
        let value = pass.process_value(value, ctx);
        ctx.leave();
        walked.push((key, value?));
    }
    Ok(Arguments::from_entries(walked))
}

/// Process arguments, properties, method calls and the factory service of a
/// definition. Bindings are not visited; see [`walk_bindings`].
pub fn walk_definition<P: RecursivePass + ?Sized>(
    pass: &mut P,
    mut definition: Definition,
    ctx: &mut VisitContext<'_>,
) -> Result<Definition> {
    definition.arguments = walk_arguments(pass, definition.arguments, "arguments", ctx)?;

    let mut properties = IndexMap::with_capacity(definition.properties.len());
    for (name, value) in definition.properties {
        ctx.enter(format!("properties.{name}"));
        let value = pass.process_value(value, ctx);
        ctx.leave();
        properties.insert(name, value?);
    }
    definition.properties = properties;

    let mut calls = Vec::with_capacity(definition.calls.len());
    for (i, mut call) in definition.calls.into_iter().enumerate() {
        let prefix = format!("calls[{i}].{}", call.method);
        call.arguments = walk_arguments(pass, call.arguments, &prefix, ctx)?;
        calls.push(call);
    }
    definition.calls = calls;

    if let Some(mut factory) = definition.factory.take() {
        if let Some(reference) = factory.service.take() {
            ctx.enter("factory".to_string());
            let value = pass.process_value(Value::Reference(reference), ctx);
            ctx.leave();
            factory.service = match value? {
                Value::Reference(reference) => Some(reference),
                _ => None,
            };
        }
        definition.factory = Some(factory);
    }

    Ok(definition)
}

/// Process the values of a definition's bindings, keeping ids and usage state.
pub fn walk_bindings<P: RecursivePass + ?Sized>(
    pass: &mut P,
    bindings: IndexMap<String, Binding>,
    ctx: &mut VisitContext<'_>,
) -> Result<IndexMap<String, Binding>> {
    let mut walked = IndexMap::with_capacity(bindings.len());
    for (key, mut binding) in bindings {
        ctx.enter(format!("bind[{key}]"));
        let value = pass.process_value(binding.value().clone(), ctx);
        ctx.leave();
        binding.set_value(value?);
        walked.insert(key, binding);
    }
    Ok(walked)
}

/// Run `pass` over every definition of `container`, abstract ones included.
///
/// # Errors
///
/// Stops at the first error of `pass`. Definitions processed before it keep their
/// new state.
pub fn process_container<P: RecursivePass + ?Sized>(
    pass: &mut P,
    container: &mut ContainerBuilder,
) -> Result<()> {
    for id in container.definition_ids() {
        let Some(definition) = container.definition(&id).cloned() else {
            continue;
        };
        let processed = {
            let mut ctx = VisitContext::root(container, &id);
            pass.process_definition(definition, &mut ctx)?
        };
        if let Some(slot) = container.definition_mut(&id) {
            *slot = processed;
        }
    }
    Ok(())
}
