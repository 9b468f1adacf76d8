//! Parameters and `%placeholder%` resolution.
//!
//! A string that is exactly `%name%` resolves to the parameter's value with its type
//! preserved. Placeholders embedded in a longer string are interpolated and must point
//! at scalars. `%%` escapes a literal percent sign; escapes survive resolution and are
//! only removed by [`unescape_value`] once values leave the container.

use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::core::{DiError, Result};
use crate::definition::{Arguments, Definition, Value};
use crate::utils::find_similar;

fn full_placeholder() -> &'static Regex {
    static FULL: OnceLock<Regex> = OnceLock::new();
    FULL.get_or_init(|| Regex::new(r"^%([^%\s]+)%$").expect("static regex"))
}

fn embedded_placeholder() -> &'static Regex {
    static EMBEDDED: OnceLock<Regex> = OnceLock::new();
    EMBEDDED.get_or_init(|| Regex::new(r"%%|%([^%\s]+)%").expect("static regex"))
}

/// Named parameter values with placeholder resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBag {
    /// Parameters in insertion order.
    parameters: IndexMap<String, Value>,
    /// Set once [`ParameterBag::resolve`] succeeded; later calls are no-ops.
    resolved: bool,
    /// Set by [`ParameterBag::freeze`]; `set` fails afterwards.
    frozen: bool,
}

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(parameters: IndexMap<String, Value>) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    /// Get a parameter, failing with suggestions when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::ParameterNotFound`] listing similarly named parameters.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.parameters.get(name).ok_or_else(|| DiError::ParameterNotFound {
            key: name.to_string(),
            source_id: None,
            alternatives: find_similar(name, self.parameters.keys().map(String::as_str)),
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Insert or overwrite a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::ContainerFrozen`] once the bag is frozen.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if self.frozen {
            return Err(DiError::ContainerFrozen {
                operation: format!("set parameter \"{name}\""),
            });
        }
        self.parameters.insert(name, value);
        Ok(())
    }

    /// Add every parameter of `other`, overwriting existing names.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::ContainerFrozen`] once the bag is frozen.
    pub fn add(&mut self, other: &IndexMap<String, Value>) -> Result<()> {
        for (name, value) in other {
            self.set(name.clone(), value.clone())?;
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.parameters.shift_remove(name)
    }

    pub fn all(&self) -> &IndexMap<String, Value> {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Resolve every parameter in place and unescape `%%`.
    ///
    /// Nothing is replaced unless every parameter resolves.
    ///
    /// # Errors
    ///
    /// - [`DiError::ParameterNotFound`] for a placeholder naming an unknown parameter
    /// - [`DiError::ParameterCircularReference`] when parameters refer to each other
    /// - [`DiError::InvalidParameterValue`] when a non-scalar is interpolated into a string
    pub fn resolve(&mut self) -> Result<()> {
        if self.resolved {
            return Ok(());
        }

        let mut resolved = IndexMap::with_capacity(self.parameters.len());
        for (name, value) in &self.parameters {
            let mut stack = vec![name.clone()];
            let value = self.resolve_value_with(value, &mut stack)?;
            resolved.insert(name.clone(), unescape_value(&value));
        }

        debug!("Resolved {} parameters", resolved.len());
        self.parameters = resolved;
        self.resolved = true;
        Ok(())
    }

    /// Forbid further changes.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Resolve placeholders inside `value`. References and inline definitions are
    /// returned untouched; the visitor walks into them separately.
    ///
    /// # Errors
    ///
    /// Same as [`ParameterBag::resolve`].
    pub fn resolve_value(&self, value: &Value) -> Result<Value> {
        self.resolve_value_with(value, &mut Vec::new())
    }

    /// Resolve a string that must stay a string, such as a class name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use diwire::container::ParameterBag;
    /// use diwire::definition::Value;
    ///
    /// # fn main() -> diwire::core::Result<()> {
    /// let mut bag = ParameterBag::new();
    /// bag.set("vendor", Value::from("Acme"))?;
    /// assert_eq!(bag.resolve_string("%vendor%.Mailer")?, "Acme.Mailer");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Fails like [`ParameterBag::resolve`], and with [`DiError::InvalidParameterValue`]
    /// when the result is not a scalar.
    pub fn resolve_string(&self, template: &str) -> Result<String> {
        let value = self.resolve_string_with(template, &mut Vec::new())?;
        value.to_interpolated().ok_or_else(|| DiError::InvalidParameterValue {
            key: template.trim_matches('%').to_string(),
            value_type: value.type_name().to_string(),
            template: template.to_string(),
        })
    }

    fn resolve_value_with(&self, value: &Value, stack: &mut Vec<String>) -> Result<Value> {
        match value {
            Value::String(s) => self.resolve_string_with(s, stack),
            Value::List(items) => Ok(Value::List(self.resolve_all(items, stack)?)),
            Value::Iterator(items) => Ok(Value::Iterator(self.resolve_all(items, stack)?)),
            Value::Map(entries) => {
                let mut resolved = IndexMap::with_capacity(entries.len());
                for (key, item) in entries {
                    let key = match self.resolve_string_with(key, stack)?.to_interpolated() {
                        Some(k) => k,
                        None => key.clone(),
                    };
                    resolved.insert(key, self.resolve_value_with(item, stack)?);
                }
                Ok(Value::Map(resolved))
            }
            Value::ServiceClosure(inner) => Ok(Value::ServiceClosure(Box::new(
                self.resolve_value_with(inner, stack)?,
            ))),
            other => Ok(other.clone()),
        }
    }

    fn resolve_all(&self, items: &[Value], stack: &mut Vec<String>) -> Result<Vec<Value>> {
        items.iter().map(|item| self.resolve_value_with(item, stack)).collect()
    }

    fn resolve_string_with(&self, template: &str, stack: &mut Vec<String>) -> Result<Value> {
        if let Some(captures) = full_placeholder().captures(template) {
            return self.resolve_parameter(&captures[1], stack);
        }

        if !template.contains('%') {
            return Ok(Value::String(template.to_string()));
        }

        let mut output = String::with_capacity(template.len());
        let mut last = 0;
        for captures in embedded_placeholder().captures_iter(template) {
            let Some(whole) = captures.get(0) else { continue };
            output.push_str(&template[last..whole.start()]);
            last = whole.end();

            let Some(name) = captures.get(1) else {
                output.push_str("%%");
                continue;
            };

            let value = self.resolve_parameter(name.as_str(), stack)?;
            match value.to_interpolated() {
                Some(text) => output.push_str(&text),
                None => {
                    return Err(DiError::InvalidParameterValue {
                        key: name.as_str().to_string(),
                        value_type: value.type_name().to_string(),
                        template: template.to_string(),
                    });
                }
            }
        }
        output.push_str(&template[last..]);

        Ok(Value::String(output))
    }

    fn resolve_parameter(&self, name: &str, stack: &mut Vec<String>) -> Result<Value> {
        if let Some(position) = stack.iter().position(|entry| entry == name) {
            let mut path = stack[position..].to_vec();
            path.push(name.to_string());
            return Err(DiError::ParameterCircularReference {
                key: name.to_string(),
                path,
            });
        }

        let raw = self.get(name)?.clone();
        if self.resolved {
            return Ok(raw);
        }

        stack.push(name.to_string());
        let resolved = self.resolve_value_with(&raw, stack);
        stack.pop();
        resolved
    }
}

/// Replace `%%` escapes with `%` in strings, recursing into nested values and
/// inline definitions.
pub fn unescape_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace("%%", "%")),
        Value::List(items) => Value::List(items.iter().map(unescape_value).collect()),
        Value::Iterator(items) => Value::Iterator(items.iter().map(unescape_value).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.replace("%%", "%"), unescape_value(v)))
                .collect(),
        ),
        Value::ServiceClosure(inner) => Value::ServiceClosure(Box::new(unescape_value(inner))),
        Value::Inline(definition) => Value::Inline(Box::new(unescape_definition(definition))),
        other => other.clone(),
    }
}

/// Unescape every argument, property and method-call argument of a definition.
pub fn unescape_definition(definition: &Definition) -> Definition {
    let mut definition = definition.clone();
    definition.arguments = unescape_arguments(&definition.arguments);
    for value in definition.properties.values_mut() {
        *value = unescape_value(value);
    }
    for call in &mut definition.calls {
        call.arguments = unescape_arguments(&call.arguments);
    }
    definition
}

fn unescape_arguments(arguments: &Arguments) -> Arguments {
    Arguments::from_entries(arguments.iter().map(|(k, v)| (k.clone(), unescape_value(v))))
}
