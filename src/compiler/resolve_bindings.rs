//! Fills unset constructor and method parameters from bindings.
//!
//! For each definition with bindings, every parameter of its constructor (or factory)
//! and of each method call that has no non-empty argument yet is matched against the
//! bindings: first a `Type $name` key, then `$name`, then the parameter's non-builtin
//! type. A matched binding is marked used. Once the whole container has been walked,
//! any service-level binding that never matched fails compilation.

use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

use super::CompilerPass;
use super::visitor::{RecursivePass, VisitContext, process_container, walk_definition};
use crate::container::{ClassRegistry, ContainerBuilder, Signature};
use crate::core::{DiError, Result};
use crate::definition::{Arguments, Binding, BindingOrigin, Definition};

#[derive(Debug, Default)]
pub struct ResolveBindingsPass {
    used: HashSet<u64>,
    /// binding id -> (key, declaring service id), in detection order
    unused: IndexMap<u64, (String, String)>,
    /// Constructor lookup failures, reported as hints with unused bindings.
    errors: Vec<String>,
}

impl ResolveBindingsPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&mut self, key: &str, binding: &Binding, service_id: &str) {
        if binding.is_used() {
            self.mark_used(binding.id());
        } else if binding.origin() == BindingOrigin::Service && !self.used.contains(&binding.id()) {
            self.unused
                .entry(binding.id())
                .or_insert_with(|| (key.to_string(), service_id.to_string()));
        }
    }

    fn mark_used(&mut self, id: u64) {
        self.used.insert(id);
        self.unused.shift_remove(&id);
    }

    /// Fill unset parameters of one call. Returns the keys of the bindings used.
    fn bind_arguments(
        &mut self,
        arguments: &mut Arguments,
        signature: &Signature,
        bindings: &IndexMap<String, Binding>,
    ) -> Vec<String> {
        let mut used_keys = Vec::new();

        for (position, parameter) in signature.iter().enumerate() {
            if arguments.is_supplied(position) {
                continue;
            }
            let named_key = format!("${}", parameter.name);
            if arguments
                .get(&named_key.clone().into())
                .is_some_and(|v| !v.is_empty_argument())
            {
                continue;
            }

            let typed_named_key = parameter
                .type_hint
                .as_deref()
                .map(|hint| format!("{} {named_key}", hint.trim_start_matches('?')));

            let key = typed_named_key
                .filter(|k| bindings.contains_key(k))
                .or_else(|| bindings.contains_key(&named_key).then(|| named_key.clone()))
                .or_else(|| {
                    parameter
                        .service_type()
                        .filter(|t| bindings.contains_key(*t))
                        .map(str::to_string)
                });

            let Some(key) = key else {
                continue;
            };
            let Some(binding) = bindings.get(&key) else {
                continue;
            };

            arguments.set(position, binding.value().clone());
            self.mark_used(binding.id());
            used_keys.push(key);
        }

        if !used_keys.is_empty() {
            arguments.sort_keys();
        }
        used_keys
    }
}

/// Reject keys that can never match and typed keys holding values that cannot be
/// injected by type.
///
/// # Errors
///
/// - [`DiError::InvalidBindingKey`] for an empty key or a bare `$`
/// - [`DiError::InvalidBindingValue`] when a type key (`int`, `LoggerInterface`,
///   `LoggerInterface $logger`) holds a value other than null, a reference or an
///   inline definition
fn validate_binding(key: &str, binding: &Binding, service_id: &str) -> Result<()> {
    let name = key.rsplit_once(' ').map_or(key, |(_, name)| name);
    if key.trim().is_empty() || name == "$" {
        return Err(DiError::InvalidBindingKey {
            key: key.to_string(),
            service_id: service_id.to_string(),
            reason: "expected \"$name\", a type, or \"Type $name\"".to_string(),
        });
    }

    // A bare type always injects by type. `Type $name` with a builtin type names a
    // scalar parameter and may carry any value.
    let needs_service_value = match key.split_once(' ') {
        Some((type_part, _)) => !ClassRegistry::is_builtin_type(type_part.trim_start_matches('?')),
        None => !key.starts_with('$'),
    };

    if needs_service_value && !binding.value().is_injectable_by_type() {
        return Err(DiError::InvalidBindingValue {
            key: key.to_string(),
            service_id: service_id.to_string(),
            value_type: binding.value().type_name().to_string(),
        });
    }
    Ok(())
}

impl RecursivePass for ResolveBindingsPass {
    fn process_definition(
        &mut self,
        mut definition: Definition,
        ctx: &mut VisitContext<'_>,
    ) -> Result<Definition> {
        if definition.bindings.is_empty() {
            return walk_definition(self, definition, ctx);
        }

        let service_id = ctx.current_id.clone();
        for (key, binding) in &definition.bindings {
            self.track(key, binding, &service_id);
            validate_binding(key, binding, &service_id)?;
        }

        if definition.is_abstract {
            return walk_definition(self, definition, ctx);
        }

        let constructor = match ctx.container.constructor_signature(&definition, &service_id) {
            Ok(constructor) => constructor,
            Err(e) => {
                let message = e.to_string();
                debug!("Cannot bind constructor of \"{}\": {}", service_id, message);
                self.errors.push(message.clone());
                definition.add_error(message);
                return walk_definition(self, definition, ctx);
            }
        };

        let bindings = definition.bindings.clone();
        let mut used_keys = Vec::new();

        let mut calls = std::mem::take(&mut definition.calls);
        for call in &mut calls {
            let signature = match ctx.container.method_signature(&definition, &service_id, &call.method) {
                Ok(signature) => signature,
                Err(_) if definition.factory.is_some() => continue,
                Err(e) => return Err(e),
            };
            used_keys.extend(self.bind_arguments(&mut call.arguments, &signature, &bindings));
        }
        definition.calls = calls;

        if let Some((_, signature)) = constructor {
            used_keys.extend(self.bind_arguments(&mut definition.arguments, &signature, &bindings));
        }

        for key in &used_keys {
            if let Some(binding) = definition.bindings.get_mut(key) {
                binding.mark_used();
            }
        }
        if !used_keys.is_empty() {
            debug!("Bound {} for service \"{}\"", used_keys.join(", "), service_id);
        }

        walk_definition(self, definition, ctx)
    }
}

impl CompilerPass for ResolveBindingsPass {
    fn name(&self) -> &'static str {
        "ResolveBindingsPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        self.used = container.removed_binding_ids().clone();
        self.unused.clear();
        self.errors.clear();

        process_container(self, container)?;

        if let Some((_, (key, service_id))) = self.unused.first() {
            return Err(DiError::UnusedBinding {
                key: key.clone(),
                service_id: service_id.clone(),
                hints: self.errors.clone(),
            });
        }

        let used = self.used.len();
        container.log(self.name(), format!("{used} bindings used"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ClassMetadata, Parameter};
    use crate::definition::{Reference, Value};

    fn container() -> ContainerBuilder {
        let mut container = ContainerBuilder::new();
        container.classes_mut().register(
            ClassMetadata::new("App.Client")
                .with_constructor(vec![
                    Parameter::typed("apiKey", "string"),
                    Parameter::typed("logger", "?LoggerInterface"),
                    Parameter::typed("timeout", "int").with_default(),
                ])
                .with_method("setCache", vec![Parameter::typed("cache", "CacheInterface")]),
        );
        container
    }

    #[test]
    fn test_binds_by_name() -> Result<()> {
        let mut container = container();
        container.set_definition(
            "client",
            Definition::new("App.Client")
                .with_binding("$apiKey", Value::from("123"))
                .with_binding("LoggerInterface", Value::reference("logger")),
        );

        ResolveBindingsPass::new().process(&mut container)?;

        let client = container.find_definition("client")?;
        assert_eq!(client.arguments.get_index(0), Some(&Value::from("123")));
        assert_eq!(client.arguments.get_index(1), Some(&Value::reference("logger")));
        assert!(client.bindings["$apiKey"].is_used());
        Ok(())
    }

    #[test]
    fn test_explicit_arguments_win_and_empty_strings_do_not_count() -> Result<()> {
        let mut container = container();
        container.set_definition(
            "client",
            Definition::new("App.Client")
                .with_argument(Value::from(""))
                .with_argument(Value::reference("explicit.logger"))
                .with_binding("$apiKey", Value::from("123"))
                .with_binding("$logger", Value::reference("logger")),
        );

        let err = ResolveBindingsPass::new().process(&mut container).unwrap_err();
        match err {
            DiError::UnusedBinding { key, service_id, .. } => {
                assert_eq!(key, "$logger");
                assert_eq!(service_id, "client");
            }
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[test]
    fn test_gap_is_filled_and_sorted() -> Result<()> {
        let mut container = container();
        let mut definition = Definition::new("App.Client").with_binding("$apiKey", Value::from("k"));
        definition.set_argument(2, Value::Int(30));
        definition.set_argument(1, Value::Null);
        container.set_definition("client", definition);

        ResolveBindingsPass::new().process(&mut container)?;

        let client = container.find_definition("client")?;
        let keys: Vec<String> = client.arguments.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "1", "2"]);
        Ok(())
    }

    #[test]
    fn test_method_calls_are_bound() -> Result<()> {
        let mut container = container();
        container.set_definition(
            "client",
            Definition::new("App.Client")
                .with_argument(Value::from("k"))
                .with_call("setCache", vec![])
                .with_binding("CacheInterface", Value::reference("cache")),
        );

        ResolveBindingsPass::new().process(&mut container)?;

        let client = container.find_definition("client")?;
        assert_eq!(client.calls[0].arguments.get_index(0), Some(&Value::reference("cache")));
        Ok(())
    }

    #[test]
    fn test_typed_binding_requires_service_value() {
        let mut container = container();
        container.set_definition(
            "client",
            Definition::new("App.Client").with_binding("LoggerInterface", Value::from("nope")),
        );

        let err = ResolveBindingsPass::new().process(&mut container).unwrap_err();
        match err {
            DiError::InvalidBindingValue { key, service_id, value_type } => {
                assert_eq!(key, "LoggerInterface");
                assert_eq!(service_id, "client");
                assert_eq!(value_type, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builtin_type_key_requires_service_value() {
        let mut container = container();
        container.set_definition("client", Definition::new("App.Client").with_binding("int", Value::Int(5)));

        let err = ResolveBindingsPass::new().process(&mut container).unwrap_err();
        match err {
            DiError::InvalidBindingValue { key, service_id, value_type } => {
                assert_eq!(key, "int");
                assert_eq!(service_id, "client");
                assert_eq!(value_type, "int");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builtin_typed_named_key_accepts_scalars() -> Result<()> {
        let mut container = container();
        container.set_definition(
            "client",
            Definition::new("App.Client").with_binding("string $apiKey", Value::from("123")),
        );

        ResolveBindingsPass::new().process(&mut container)?;
        let client = container.find_definition("client")?;
        assert_eq!(client.arguments.get_index(0), Some(&Value::from("123")));
        assert!(client.bindings["string $apiKey"].is_used());
        Ok(())
    }

    #[test]
    fn test_defaults_bindings_may_stay_unused() -> Result<()> {
        let mut container = container();
        let mut definition = Definition::new("App.Client").with_argument(Value::from("k"));
        definition.set_binding(
            "$projectDir",
            Binding::with_origin(Value::from("/srv"), BindingOrigin::Defaults),
        );
        container.set_definition("client", definition);

        ResolveBindingsPass::new().process(&mut container)?;
        Ok(())
    }

    #[test]
    fn test_unknown_class_becomes_hint() {
        let mut container = container();
        container.set_definition(
            "mystery",
            Definition::new("App.Unknown").with_binding("$x", Value::Int(1)),
        );

        let err = ResolveBindingsPass::new().process(&mut container).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Unused binding \"$x\" in service \"mystery\"."));
        assert!(message.contains("Could be related to:"));
        assert!(message.contains("App.Unknown"));
        assert!(container.definition("mystery").is_some_and(Definition::has_errors));
    }

    #[test]
    fn test_removed_definitions_count_as_used() -> Result<()> {
        let mut container = container();
        let binding = Binding::new(Value::Int(1));
        let shared = binding.clone();
        container.set_definition("gone", Definition::new("App.Client").with_binding("$nope", Value::Null));
        if let Some(definition) = container.definition_mut("gone") {
            definition.set_binding("$nope", binding);
        }
        container.remove_definition("gone");
        container.set_definition(
            "client",
            Definition::new("App.Client").with_argument(Value::from("k")),
        );
        if let Some(definition) = container.definition_mut("client") {
            definition.set_binding("$nope", shared);
        }

        ResolveBindingsPass::new().process(&mut container)?;
        Ok(())
    }

    #[test]
    fn test_abstract_definitions_are_only_tracked() {
        let mut container = container();
        container.set_definition(
            "base",
            Definition::new("App.Client")
                .with_abstract(true)
                .with_binding("$apiKey", Value::from("k")),
        );

        let err = ResolveBindingsPass::new().process(&mut container).unwrap_err();
        assert!(matches!(err, DiError::UnusedBinding { .. }));
    }

    #[test]
    fn test_inline_definitions_are_bound() -> Result<()> {
        let mut container = container();
        let inline = Definition::new("App.Client").with_binding("$apiKey", Value::from("inner"));
        container.register("holder", "App.Holder").set_argument(0, Value::from(inline));
        container.classes_mut().register(ClassMetadata::new("App.Holder"));

        ResolveBindingsPass::new().process(&mut container)?;

        let holder = container.find_definition("holder")?;
        match holder.arguments.get_index(0) {
            Some(Value::Inline(inner)) => {
                assert_eq!(inner.arguments.get_index(0), Some(&Value::from("inner")));
            }
            other => panic!("unexpected argument: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_typed_named_key() -> Result<()> {
        let mut container = container();
        container.set_definition(
            "client",
            Definition::new("App.Client")
                .with_argument(Value::from("k"))
                .with_binding("LoggerInterface $logger", Value::Reference(Reference::new("log"))),
        );

        ResolveBindingsPass::new().process(&mut container)?;
        let client = container.find_definition("client")?;
        assert_eq!(client.arguments.get_index(1), Some(&Value::reference("log")));
        Ok(())
    }
}
