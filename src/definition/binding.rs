//! Bindings: default values for constructor/method parameters, matched by name or type.
//!
//! A binding key is either `$name` (matches a parameter by name) or a type string
//! (matches a parameter whose declared type is that type). Every binding carries a
//! process-wide unique id so the unused-binding check can tell copies inherited from
//! `defaults` apart from bindings declared on the service itself. Cloning a binding
//! keeps its id.

use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};

use super::Value;

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Where a binding was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindingOrigin {
    /// Declared on the service itself; must be used.
    #[default]
    Service,
    /// Inherited from file-level defaults; may stay unused.
    Defaults,
    /// Inherited from an instanceof rule; may stay unused.
    Instanceof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    value: Value,
    id: u64,
    used: bool,
    origin: BindingOrigin,
}

impl Binding {
    pub fn new(value: Value) -> Self {
        Self::with_origin(value, BindingOrigin::Service)
    }

    pub fn with_origin(value: Value, origin: BindingOrigin) -> Self {
        Self {
            value,
            id: NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed),
            used: false,
            origin,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn mark_used(&mut self) {
        self.used = true;
    }

    pub fn origin(&self) -> BindingOrigin {
        self.origin
    }

    /// Replace the value, keeping id and usage state.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}

/// Whether the key matches parameters by type rather than by `$name`.
#[must_use]
pub fn is_typed_key(key: &str) -> bool {
    !key.starts_with('$')
}

impl Serialize for Binding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
