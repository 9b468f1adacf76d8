//! Explicit class schemas.
//!
//! Passes that need to know what a class looks like (constructor parameters, methods,
//! implemented interfaces, subscribed events) ask the [`ClassRegistry`]. Schemas are
//! declared up front in the `[classes]` section of container files or registered in
//! code. Interfaces are registered as classes too, with their parent interfaces listed
//! in `interfaces`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name of the constructor in method lookups and error messages.
pub const CONSTRUCTOR: &str = "__construct";

/// Types that never identify a service.
const BUILTIN_TYPES: [&str; 16] = [
    "int", "float", "string", "bool", "array", "callable", "iterable", "object", "mixed", "void",
    "null", "false", "true", "self", "static", "never",
];

/// A constructor or method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(rename = "default", default)]
    pub has_default: bool,
    #[serde(default)]
    pub variadic: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            has_default: false,
            variadic: false,
        }
    }

    pub fn typed(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            type_hint: Some(type_hint.into()),
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// The type hint usable for type-based injection: nullable marker stripped,
    /// builtin types excluded.
    pub fn service_type(&self) -> Option<&str> {
        let hint = self.type_hint.as_deref()?.trim_start_matches('?');
        (!hint.is_empty() && !ClassRegistry::is_builtin_type(hint)).then_some(hint)
    }
}

pub type Signature = Vec<Parameter>;

/// An event a subscriber listens to, as declared by its class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribedEvent {
    pub event: String,
    pub method: String,
    #[serde(default)]
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<Signature>,
    #[serde(default)]
    pub methods: IndexMap<String, Signature>,
    #[serde(default)]
    pub subscribed_events: Vec<SubscribedEvent>,
}

impl ClassMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    #[must_use]
    pub fn with_constructor(mut self, parameters: Signature) -> Self {
        self.constructor = Some(parameters);
        self
    }

    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>, parameters: Signature) -> Self {
        self.methods.insert(name.into(), parameters);
        self
    }

    #[must_use]
    pub fn with_subscribed_event(
        mut self,
        event: impl Into<String>,
        method: impl Into<String>,
        priority: i64,
    ) -> Self {
        self.subscribed_events.push(SubscribedEvent {
            event: event.into(),
            method: method.into(),
            priority,
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassRegistry {
    classes: IndexMap<String, ClassMetadata>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class schema, replacing any previous one with the same name.
    pub fn register(&mut self, metadata: ClassMetadata) {
        self.classes.insert(metadata.name.clone(), metadata);
    }

    pub fn get(&self, class: &str) -> Option<&ClassMetadata> {
        self.classes.get(class)
    }

    pub fn has(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Add every class of `other`; existing schemas are kept.
    pub fn merge(&mut self, other: &ClassRegistry) {
        for (name, metadata) in &other.classes {
            self.classes.entry(name.clone()).or_insert_with(|| metadata.clone());
        }
    }

    /// The class followed by its ancestors, stopping at unknown or repeated classes.
    fn lineage<'a>(&'a self, class: &str) -> Vec<&'a ClassMetadata> {
        let mut lineage = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.classes.get(class);
        while let Some(metadata) = current {
            if !seen.insert(metadata.name.as_str()) {
                break;
            }
            lineage.push(metadata);
            current = metadata.parent.as_deref().and_then(|p| self.classes.get(p));
        }
        lineage
    }

    /// Constructor parameters, inherited from the nearest ancestor declaring one.
    /// `None` when the class is unknown; an empty signature when no constructor exists.
    pub fn constructor(&self, class: &str) -> Option<Signature> {
        if !self.has(class) {
            return None;
        }
        Some(
            self.lineage(class)
                .into_iter()
                .find_map(|m| m.constructor.clone())
                .unwrap_or_default(),
        )
    }

    /// A method's parameters, searching ancestors.
    pub fn method(&self, class: &str, method: &str) -> Option<&Signature> {
        if method == CONSTRUCTOR {
            return self.lineage(class).into_iter().find_map(|m| m.constructor.as_ref());
        }
        self.lineage(class).into_iter().find_map(|m| m.methods.get(method))
    }

    pub fn has_method(&self, class: &str, method: &str) -> bool {
        self.method(class, method).is_some()
    }

    /// Whether `class` is, extends or implements `interface`, transitively through
    /// parents and parent interfaces.
    pub fn implements(&self, class: &str, interface: &str) -> bool {
        let mut pending = vec![class.to_string()];
        let mut seen = HashSet::new();

        while let Some(current) = pending.pop() {
            if current == interface {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(metadata) = self.classes.get(&current) {
                pending.extend(metadata.interfaces.iter().cloned());
                pending.extend(metadata.parent.iter().cloned());
            }
        }

        false
    }

    pub fn is_builtin_type(type_name: &str) -> bool {
        let normalized = type_name.trim_start_matches('?').to_ascii_lowercase();
        BUILTIN_TYPES.contains(&normalized.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassMetadata> {
        self.classes.values()
    }
}
