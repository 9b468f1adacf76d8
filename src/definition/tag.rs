//! Tag attribute maps and typed views over well-known tags.
//!
//! Attributes stay untyped [`Value`]s on the definition. Passes that care about a
//! tag parse its attributes once through [`ListenerTag`] or [`WorkflowTag`], which
//! report bad or missing attributes against the tag and the service carrying it.

use indexmap::IndexMap;

use super::Value;
use crate::core::{DiError, Result};

/// Attributes of one tag occurrence on a service.
pub type TagAttributes = IndexMap<String, Value>;

/// Build an attribute map from `(name, value)` pairs.
pub fn attributes<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> TagAttributes
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// String form of an attribute, accepting scalars.
pub fn attribute_string(attrs: &TagAttributes, name: &str) -> Option<String> {
    match attrs.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

/// The `priority` attribute: absent means 0; integers and numeric strings are accepted.
///
/// # Errors
///
/// Returns [`DiError::InvalidTagAttribute`] for a non-numeric string or any other
/// value type.
pub fn priority(attrs: &TagAttributes, tag: &str, service_id: &str) -> Result<i64> {
    let invalid = |reason: String| DiError::InvalidTagAttribute {
        attribute: "priority".to_string(),
        tag: tag.to_string(),
        service_id: service_id.to_string(),
        reason,
    };

    match attrs.get("priority") {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Int(i)) => Ok(*i),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("\"{s}\" is not an integer"))),
        Some(other) => Err(invalid(format!("expected an integer, {} given", other.type_name()))),
    }
}

/// A `kernel.event_listener` occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerTag {
    /// Event name. When absent it is taken from the first parameter type of `method`.
    pub event: Option<String>,
    /// Listener method. Derived from the event name when absent.
    pub method: Option<String>,
    pub priority: i64,
    /// Dispatcher service id, overriding the pass default.
    pub dispatcher: Option<String>,
}

impl ListenerTag {
    /// Read a listener occurrence. Empty strings count as absent.
    ///
    /// # Errors
    ///
    /// Fails only on an invalid `priority`, see [`priority`].
    pub fn from_attributes(attrs: &TagAttributes, tag: &str, service_id: &str) -> Result<Self> {
        Ok(Self {
            event: attribute_string(attrs, "event").filter(|e| !e.is_empty()),
            method: attribute_string(attrs, "method").filter(|m| !m.is_empty()),
            priority: priority(attrs, tag, service_id)?,
            dispatcher: attribute_string(attrs, "dispatcher").filter(|d| !d.is_empty()),
        })
    }
}

/// A `workflow.definition` occurrence; all three attributes are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTag {
    pub name: String,
    /// `workflow` or `state_machine`, from the `type` attribute.
    pub workflow_type: String,
    /// Marking store kind, such as `single_state` or `multiple_state`.
    pub marking_store: String,
}

impl WorkflowTag {
    /// # Errors
    ///
    /// Returns [`DiError::MissingTagAttribute`] for the first of `name`, `type` and
    /// `marking_store` that is absent or empty.
    pub fn from_attributes(attrs: &TagAttributes, tag: &str, service_id: &str) -> Result<Self> {
        let required = |attribute: &str| {
            attribute_string(attrs, attribute)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DiError::MissingTagAttribute {
                    attribute: attribute.to_string(),
                    tag: tag.to_string(),
                    service_id: service_id.to_string(),
                })
        };

        Ok(Self {
            name: required("name")?,
            workflow_type: required("type")?,
            marking_store: required("marking_store")?,
        })
    }
}
