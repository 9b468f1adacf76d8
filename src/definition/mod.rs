//! Service definition model
//!
//! A [`Definition`] is a recipe for building one service: its class, constructor
//! arguments, method calls to run after construction, properties to set, an optional
//! factory, bindings for parameters left unset, tags and a handful of flags.
//!
//! Argument trees are made of [`Value`]s, which may contain [`Reference`]s to other
//! services, inline definitions and lazy wrappers. Passes rewrite these trees until
//! every reference resolves.
//!
//! # Examples
//!
//! ```rust
//! use diwire::definition::{Definition, Value};
//!
//! let mailer = Definition::new("App.Mailer")
//!     .with_argument(Value::reference("transport"))
//!     .with_call("setLogger", vec![Value::reference("logger")])
//!     .with_tag("logger.aware")
//!     .with_public(true);
//!
//! assert!(mailer.has_method_call("setLogger"));
//! assert!(mailer.has_tag("logger.aware"));
//! ```

pub mod alias;
pub mod binding;
pub mod tag;
pub mod value;

pub use alias::Alias;
pub use binding::{Binding, BindingOrigin};
pub use tag::{ListenerTag, TagAttributes, WorkflowTag};
pub use value::{ArgumentKey, Arguments, InvalidBehavior, Reference, Value};

use indexmap::IndexMap;
use serde::Serialize;

/// A method to call on the service after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodCall {
    pub method: String,
    /// Arguments, positional or `$name` keyed until named arguments are resolved.
    #[serde(skip_serializing_if = "Arguments::is_empty")]
    pub arguments: Arguments,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments: Arguments::from_values(arguments),
        }
    }
}

/// How a service is created when not through its class constructor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Factory {
    /// Class declaring a static factory method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Service whose method builds this one. Ignored when `class` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Reference>,
    pub method: String,
}

impl Factory {
    /// A static factory method on `class`.
    pub fn class(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            service: None,
            method: method.into(),
        }
    }

    /// A method on another service.
    pub fn service(id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: None,
            service: Some(Reference::new(id)),
            method: method.into(),
        }
    }
}

impl Serialize for Reference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Reference(self.clone()).serialize(serializer)
    }
}

/// A service definition.
///
/// Fields are public so passes can rewrite them directly; the `with_*` builders
/// are a convenience for constructing definitions by hand.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Definition {
    /// Class name, possibly containing `%parameter%` placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Constructor (or factory method) arguments.
    #[serde(skip_serializing_if = "Arguments::is_empty")]
    pub arguments: Arguments,
    /// Methods called after construction, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<MethodCall>,
    /// Public properties assigned after construction.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory: Option<Factory>,
    /// Values for unset arguments, keyed by `$name`, `Type`, or `Type $name`.
    #[serde(rename = "bind", skip_serializing_if = "IndexMap::is_empty")]
    pub bindings: IndexMap<String, Binding>,
    /// Tag name to every attribute set it was added with.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, Vec<TagAttributes>>,
    /// Template-only definition, removed during compilation.
    #[serde(rename = "abstract", skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    /// Reachable from outside the container. Public services are never removed.
    pub public: bool,
    /// Injected at runtime rather than built by the container.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
    /// Deferred errors, raised only if the definition survives removal.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Definition {
    /// A private definition for `class`.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Self::default()
        }
    }

    /// Insert or replace an argument.
    pub fn set_argument(&mut self, key: impl Into<ArgumentKey>, value: Value) -> &mut Self {
        self.arguments.set(key, value);
        self
    }

    /// Replace an existing positional argument. Returns the previous value, or
    /// `None` (leaving the definition untouched) when there was no argument at `index`.
    pub fn replace_argument(&mut self, index: usize, value: Value) -> Option<Value> {
        if self.arguments.get_index(index).is_none() {
            return None;
        }
        self.arguments.set(index, value)
    }

    pub fn add_method_call(&mut self, method: impl Into<String>, arguments: Vec<Value>) -> &mut Self {
        self.calls.push(MethodCall::new(method, arguments));
        self
    }

    pub fn has_method_call(&self, method: &str) -> bool {
        self.calls.iter().any(|c| c.method == method)
    }

    /// Remove every call to `method`.
    pub fn remove_method_call(&mut self, method: &str) -> &mut Self {
        self.calls.retain(|c| c.method != method);
        self
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn set_factory(&mut self, factory: Factory) -> &mut Self {
        self.factory = Some(factory);
        self
    }

    /// Add one occurrence of a tag.
    pub fn add_tag(&mut self, name: impl Into<String>, attributes: TagAttributes) -> &mut Self {
        self.tags.entry(name.into()).or_default().push(attributes);
        self
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// All occurrences of a tag (empty when absent).
    pub fn tag(&self, name: &str) -> &[TagAttributes] {
        self.tags.get(name).map_or(&[], Vec::as_slice)
    }

    /// Bind a service-origin value to `key` (`$name` or a type).
    pub fn bind(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.bindings.insert(key.into(), Binding::new(value));
        self
    }

    pub fn set_binding(&mut self, key: impl Into<String>, binding: Binding) -> &mut Self {
        self.bindings.insert(key.into(), binding);
        self
    }

    pub fn add_error(&mut self, message: impl Into<String>) -> &mut Self {
        self.errors.push(message.into());
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Ids of all bindings declared on this definition.
    pub fn binding_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.bindings.values().map(Binding::id)
    }

    /// Append a positional argument.
    #[must_use]
    pub fn with_argument(mut self, value: Value) -> Self {
        self.arguments.push(value);
        self
    }

    #[must_use]
    pub fn with_named_argument(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.set(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_call(mut self, method: impl Into<String>, arguments: Vec<Value>) -> Self {
        self.add_method_call(method, arguments);
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_property(name, value);
        self
    }

    #[must_use]
    pub fn with_factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Add a tag occurrence without attributes.
    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.add_tag(name, TagAttributes::new());
        self
    }

    #[must_use]
    pub fn with_tag_attributes(mut self, name: impl Into<String>, attributes: TagAttributes) -> Self {
        self.add_tag(name, attributes);
        self
    }

    #[must_use]
    pub fn with_binding(mut self, key: impl Into<String>, value: Value) -> Self {
        self.bind(key, value);
        self
    }

    #[must_use]
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    #[must_use]
    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    #[must_use]
    pub fn with_synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }
}
