//! The container builder: the mutable service graph that compiler passes transform.
//!
//! [`ContainerBuilder`] owns every definition, alias and parameter, the class registry,
//! registered extensions with their raw configuration, and the bookkeeping the passes
//! share (tracked resources, removed binding ids, compiler log).
//!
//! Registration order is preserved everywhere: definitions, aliases, tags and extension
//! configuration are all kept in insertion order so passes and dumps are deterministic.
//!
//! Once [`ContainerBuilder::freeze`] has run, configuration-changing entry points fail
//! with [`DiError::ContainerFrozen`].
//!
//! # Examples
//!
//! ```rust
//! use diwire::container::ContainerBuilder;
//! use diwire::definition::{Alias, Value};
//!
//! # fn main() -> diwire::core::Result<()> {
//! let mut container = ContainerBuilder::new();
//! container.register("mailer", "App.Mailer").set_argument(0, Value::reference("transport"));
//! container.register("transport", "App.SmtpTransport");
//! container.set_alias("mail", Alias::new("mailer").with_public(true))?;
//!
//! assert_eq!(container.find_definition("mail")?.class.as_deref(), Some("App.Mailer"));
//! # Ok(())
//! # }
//! ```

pub mod class_registry;
pub mod extension;
pub mod parameter_bag;

pub use class_registry::{ClassMetadata, ClassRegistry, Parameter, Signature, SubscribedEvent};
pub use extension::{Extension, ParameterExtension};
pub use parameter_bag::ParameterBag;

use indexmap::IndexMap;
use indexmap::map::Entry;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::core::{DiError, Result};
use crate::definition::{Alias, Definition, TagAttributes, Value};
use crate::utils::find_similar;
use class_registry::CONSTRUCTOR;

/// The service graph under construction.
///
/// Passes receive `&mut ContainerBuilder` and read or rewrite it in place. Nothing
/// here is shared between threads; a compile owns its container for its whole run.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    /// Service definitions keyed by id, in registration order.
    definitions: IndexMap<String, Definition>,
    /// Alias id to alias target.
    aliases: IndexMap<String, Alias>,
    /// Parameters, possibly still holding `%name%` placeholders until frozen.
    parameters: ParameterBag,
    /// Known class schemas used for autowiring and signature checks.
    classes: ClassRegistry,
    /// Registered extensions keyed by alias (their configuration namespace).
    extensions: IndexMap<String, Arc<dyn Extension>>,
    /// Raw configuration queued per namespace, prepends first.
    extension_configs: IndexMap<String, Vec<Value>>,
    /// Files the container was built from, deduplicated.
    resources: Vec<String>,
    /// When false, `add_resource` is a no-op.
    track_resources: bool,
    /// Expression function providers registered by extensions.
    expression_providers: Vec<String>,
    /// Binding ids of definitions removed during compilation.
    removed_binding_ids: HashSet<u64>,
    /// One `pass: message` line per logged compiler event.
    compiler_log: Vec<String>,
    /// Set by [`ContainerBuilder::freeze`].
    compiled: bool,
    /// Set on the temporary container an extension loads into.
    loading_extension: Option<String>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            track_resources: true,
            ..Self::default()
        }
    }

    /// A container pre-populated with parameters.
    pub fn with_parameters(parameters: ParameterBag) -> Self {
        Self {
            parameters,
            ..Self::new()
        }
    }

    // Definitions

    /// Register a new private definition for `class` under `id`.
    pub fn register(&mut self, id: impl Into<String>, class: impl Into<String>) -> &mut Definition {
        self.set_definition(id, Definition::new(class))
    }

    /// Set (or replace, keeping the position) the definition for `id`. An alias with
    /// the same id is removed.
    pub fn set_definition(&mut self, id: impl Into<String>, definition: Definition) -> &mut Definition {
        let id = id.into();
        self.aliases.shift_remove(&id);
        match self.definitions.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(definition);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(definition),
        }
    }

    pub fn add_definitions(&mut self, definitions: impl IntoIterator<Item = (String, Definition)>) {
        for (id, definition) in definitions {
            self.set_definition(id, definition);
        }
    }

    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    pub fn definition_mut(&mut self, id: &str) -> Option<&mut Definition> {
        self.definitions.get_mut(id)
    }

    pub fn definitions(&self) -> &IndexMap<String, Definition> {
        &self.definitions
    }

    /// Ids of all definitions in registration order.
    pub fn definition_ids(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    /// Find a definition by id or alias.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::CircularAlias`] when the alias chain loops, and
    /// [`DiError::ServiceNotFound`] (with close-match suggestions) when nothing is
    /// registered under the resolved id.
    pub fn find_definition(&self, id: &str) -> Result<&Definition> {
        let target = self.resolve_alias_target(id)?;
        self.definitions.get(&target).ok_or_else(|| self.service_not_found(id, None))
    }

    /// Whether `id` is a definition or an alias.
    pub fn has(&self, id: &str) -> bool {
        self.has_definition(id) || self.has_alias(id)
    }

    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Remove a definition. Its binding ids are remembered so the unused-binding
    /// check does not report bindings of services that no longer exist.
    pub fn remove_definition(&mut self, id: &str) -> Option<Definition> {
        let removed = self.definitions.shift_remove(id)?;
        self.removed_binding_ids.extend(removed.binding_ids());
        debug!("Removed definition \"{}\"", id);
        Some(removed)
    }

    pub fn removed_binding_ids(&self) -> &HashSet<u64> {
        &self.removed_binding_ids
    }

    /// Build the not-found error for `id`, with suggestions.
    pub fn service_not_found(&self, id: &str, source_id: Option<&str>) -> DiError {
        let candidates = self.definitions.keys().chain(self.aliases.keys()).map(String::as_str);
        DiError::ServiceNotFound {
            id: id.to_string(),
            source_id: source_id.map(str::to_string),
            alternatives: find_similar(id, candidates),
        }
    }

    // Aliases

    /// Register `alias` pointing at `target`. A definition with the same id is removed.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::InvalidService`] when the alias points at itself.
    pub fn set_alias(&mut self, alias: impl Into<String>, target: Alias) -> Result<()> {
        let alias = alias.into();
        if alias == target.target() {
            return Err(DiError::InvalidService {
                service_id: alias,
                reason: "an alias cannot reference itself".to_string(),
            });
        }
        self.definitions.shift_remove(&alias);
        self.aliases.insert(alias, target);
        Ok(())
    }

    /// Register several aliases, stopping at the first invalid one.
    ///
    /// # Errors
    ///
    /// Same as [`ContainerBuilder::set_alias`].
    pub fn add_aliases(&mut self, aliases: impl IntoIterator<Item = (String, Alias)>) -> Result<()> {
        for (alias, target) in aliases {
            self.set_alias(alias, target)?;
        }
        Ok(())
    }

    pub fn alias(&self, id: &str) -> Option<&Alias> {
        self.aliases.get(id)
    }

    pub fn alias_mut(&mut self, id: &str) -> Option<&mut Alias> {
        self.aliases.get_mut(id)
    }

    pub fn aliases(&self) -> &IndexMap<String, Alias> {
        &self.aliases
    }

    pub fn has_alias(&self, id: &str) -> bool {
        self.aliases.contains_key(id)
    }

    pub fn remove_alias(&mut self, id: &str) -> Option<Alias> {
        self.aliases.shift_remove(id)
    }

    /// Follow an alias chain to the final id (which may not exist). Non-aliases
    /// resolve to themselves.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::CircularAlias`] with the full path when an alias is seen twice.
    pub fn resolve_alias_target(&self, id: &str) -> Result<String> {
        let mut path = vec![id.to_string()];
        let mut current = id;

        while let Some(alias) = self.aliases.get(current) {
            current = alias.target();
            if path.iter().any(|seen| seen == current) {
                path.push(current.to_string());
                return Err(DiError::CircularAlias {
                    alias: id.to_string(),
                    path,
                });
            }
            path.push(current.to_string());
        }

        Ok(current.to_string())
    }

    // Parameters

    pub fn parameters(&self) -> &ParameterBag {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterBag {
        &mut self.parameters
    }

    /// The raw value of parameter `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::ParameterNotFound`] when no such parameter exists.
    pub fn parameter(&self, name: &str) -> Result<&Value> {
        self.parameters.get(name)
    }

    /// # Errors
    ///
    /// Returns [`DiError::ContainerFrozen`] once the container has been compiled.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if self.compiled {
            return Err(DiError::ContainerFrozen {
                operation: format!("set parameter \"{name}\""),
            });
        }
        self.parameters.set(name, value)
    }

    // Classes

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        &mut self.classes
    }

    /// Metadata for a class name that may contain parameter placeholders.
    ///
    /// # Errors
    ///
    /// Fails when a placeholder in `class` cannot be resolved.
    pub fn reflection_class(&self, class: &str) -> Result<Option<&ClassMetadata>> {
        let class = self.parameters.resolve_string(class)?;
        Ok(self.classes.get(&class))
    }

    /// The parameters of whatever creates this definition: the factory method when
    /// there is one, the class constructor otherwise. `None` when the definition has
    /// neither a class nor a factory.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::ClassNotFound`] when the class involved has no schema, and
    /// [`DiError::InvalidService`] when the factory method is not declared on it.
    pub fn constructor_signature(
        &self,
        definition: &Definition,
        service_id: &str,
    ) -> Result<Option<(String, Signature)>> {
        if let Some(factory) = &definition.factory {
            let factory_class = match (&factory.class, &factory.service) {
                (Some(class), _) => Some(self.parameters.resolve_string(class)?),
                (None, Some(reference)) => match self.find_definition(&reference.id) {
                    Ok(service) => match &service.class {
                        Some(class) => Some(self.parameters.resolve_string(class)?),
                        None => None,
                    },
                    Err(_) => None,
                },
                (None, None) => definition
                    .class
                    .as_deref()
                    .map(|class| self.parameters.resolve_string(class))
                    .transpose()?,
            };

            let Some(class) = factory_class else {
                return Ok(None);
            };
            let metadata = self.classes.get(&class).ok_or_else(|| DiError::ClassNotFound {
                class: class.clone(),
                service_id: service_id.to_string(),
            })?;
            let signature = self.classes.method(&metadata.name, &factory.method).cloned().ok_or_else(
                || DiError::InvalidService {
                    service_id: service_id.to_string(),
                    reason: format!("method \"{class}::{}()\" does not exist", factory.method),
                },
            )?;
            return Ok(Some((factory.method.clone(), signature)));
        }

        let Some(class) = &definition.class else {
            return Ok(None);
        };
        let class = self.parameters.resolve_string(class)?;
        let signature = self.classes.constructor(&class).ok_or_else(|| DiError::ClassNotFound {
            class: class.clone(),
            service_id: service_id.to_string(),
        })?;
        Ok(Some((CONSTRUCTOR.to_string(), signature)))
    }

    /// The parameters of a method called on this definition's class.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::InvalidService`] when the definition has no class or the
    /// method is unknown, and [`DiError::ClassNotFound`] when the class has no schema.
    pub fn method_signature(
        &self,
        definition: &Definition,
        service_id: &str,
        method: &str,
    ) -> Result<Signature> {
        let class = match &definition.class {
            Some(class) => self.parameters.resolve_string(class)?,
            None => {
                return Err(DiError::InvalidService {
                    service_id: service_id.to_string(),
                    reason: format!("cannot call \"{method}()\" on a definition without a class"),
                });
            }
        };
        if !self.classes.has(&class) {
            return Err(DiError::ClassNotFound {
                class,
                service_id: service_id.to_string(),
            });
        }
        self.classes.method(&class, method).cloned().ok_or_else(|| DiError::InvalidService {
            service_id: service_id.to_string(),
            reason: format!("method \"{class}::{method}()\" does not exist"),
        })
    }

    // Extensions

    /// Register an extension under its alias. Re-registering an alias replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::ExtensionRegistrationForbidden`] on a container that an
    /// extension is currently loading into, and [`DiError::ContainerFrozen`] after
    /// compilation.
    pub fn register_extension(&mut self, extension: Arc<dyn Extension>) -> Result<()> {
        let alias = extension.alias().to_string();
        if let Some(loading) = &self.loading_extension {
            return Err(DiError::ExtensionRegistrationForbidden {
                extension: alias,
                loading: loading.clone(),
            });
        }
        if self.compiled {
            return Err(DiError::ContainerFrozen {
                operation: format!("register extension \"{alias}\""),
            });
        }
        debug!("Registered extension \"{}\"", alias);
        self.extensions.insert(alias, extension);
        Ok(())
    }

    pub fn extension(&self, alias: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.get(alias).cloned()
    }

    pub fn has_extension(&self, alias: &str) -> bool {
        self.extensions.contains_key(alias)
    }

    /// Registered extensions in registration order.
    pub fn extensions(&self) -> Vec<Arc<dyn Extension>> {
        self.extensions.values().cloned().collect()
    }

    /// Queue configuration for the extension handling `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::ExtensionNotFound`] when no extension has that alias, and
    /// [`DiError::ContainerFrozen`] after compilation.
    pub fn load_from_extension(&mut self, namespace: &str, config: Value) -> Result<()> {
        if self.compiled {
            return Err(DiError::ContainerFrozen {
                operation: format!("load configuration for \"{namespace}\""),
            });
        }
        if !self.extensions.contains_key(namespace) {
            return Err(DiError::ExtensionNotFound {
                namespace: namespace.to_string(),
                available: self.extensions.keys().cloned().collect(),
            });
        }
        self.extension_configs.entry(namespace.to_string()).or_default().push(config);
        Ok(())
    }

    /// Put configuration in front of everything already queued for `namespace`.
    pub fn prepend_extension_config(&mut self, namespace: &str, config: Value) {
        self.extension_configs.entry(namespace.to_string()).or_default().insert(0, config);
    }

    pub fn extension_config(&self, namespace: &str) -> &[Value] {
        self.extension_configs.get(namespace).map_or(&[], Vec::as_slice)
    }

    pub fn extension_configs(&self) -> &IndexMap<String, Vec<Value>> {
        &self.extension_configs
    }

    /// An empty container for `extension` to load into. It shares the parameters,
    /// resource tracking, expression providers, class registry and synthetic
    /// definitions of this container, and refuses to register extensions.
    pub fn new_for_extension(&self, extension: &str, parameters: ParameterBag) -> Self {
        let mut container = Self::with_parameters(parameters);
        container.track_resources = self.track_resources;
        container.expression_providers = self.expression_providers.clone();
        container.classes = self.classes.clone();
        container.loading_extension = Some(extension.to_string());
        for (id, definition) in &self.definitions {
            if definition.synthetic {
                container.definitions.insert(id.clone(), definition.clone());
            }
        }
        container
    }

    /// Merge another container into this one. Definitions and aliases of `other`
    /// replace existing ones with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::ContainerFrozen`] after compilation, or the first alias or
    /// parameter error raised while copying `other` in.
    pub fn merge(&mut self, other: ContainerBuilder) -> Result<()> {
        if self.compiled {
            return Err(DiError::ContainerFrozen {
                operation: "merge".to_string(),
            });
        }

        self.add_definitions(other.definitions);
        self.add_aliases(other.aliases)?;
        self.parameters.add(other.parameters.all())?;
        self.classes.merge(&other.classes);
        for resource in other.resources {
            self.add_resource(resource);
        }
        for (namespace, configs) in other.extension_configs {
            self.extension_configs.entry(namespace).or_default().extend(configs);
        }
        for provider in other.expression_providers {
            self.add_expression_provider(provider);
        }
        self.removed_binding_ids.extend(other.removed_binding_ids);
        Ok(())
    }

    // Resources

    pub fn set_resource_tracking(&mut self, track: bool) {
        self.track_resources = track;
    }

    pub fn is_tracking_resources(&self) -> bool {
        self.track_resources
    }

    /// Record a file the container was built from.
    pub fn add_resource(&mut self, resource: impl Into<String>) {
        if !self.track_resources {
            return;
        }
        let resource = resource.into();
        if !self.resources.contains(&resource) {
            self.resources.push(resource);
        }
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn add_expression_provider(&mut self, provider: impl Into<String>) {
        let provider = provider.into();
        if !self.expression_providers.contains(&provider) {
            self.expression_providers.push(provider);
        }
    }

    pub fn expression_providers(&self) -> &[String] {
        &self.expression_providers
    }

    // Tags

    /// Services carrying `tag`, in registration order, with every attribute set.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::AbstractTaggedService`] for an abstract tagged definition
    /// when `throw_on_abstract` is set.
    pub fn find_tagged_service_ids(
        &self,
        tag: &str,
        throw_on_abstract: bool,
    ) -> Result<IndexMap<String, Vec<TagAttributes>>> {
        let mut tagged = IndexMap::new();
        for (id, definition) in &self.definitions {
            if !definition.has_tag(tag) {
                continue;
            }
            if throw_on_abstract && definition.is_abstract {
                return Err(DiError::AbstractTaggedService {
                    service_id: id.clone(),
                    tag: tag.to_string(),
                });
            }
            tagged.insert(id.clone(), definition.tag(tag).to_vec());
        }
        Ok(tagged)
    }

    // Compilation state

    /// Append an entry to the compiler log.
    pub fn log(&mut self, pass: &str, message: impl AsRef<str>) {
        self.compiler_log.push(format!("{pass}: {}", message.as_ref()));
    }

    pub fn compiler_log(&self) -> &[String] {
        &self.compiler_log
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Resolve and freeze the parameters and mark the container compiled.
    ///
    /// # Errors
    ///
    /// Propagates parameter resolution failures such as a missing or circular
    /// parameter reference. The container stays unfrozen in that case.
    pub fn freeze(&mut self) -> Result<()> {
        self.parameters.resolve()?;
        self.parameters.freeze();
        self.compiled = true;
        Ok(())
    }
}
