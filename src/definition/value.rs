//! Argument values, references and argument lists.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use super::Definition;

/// What to do when a reference points to a service that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidBehavior {
    /// Fail compilation.
    #[default]
    Exception,
    /// Substitute `null`.
    Null,
    /// Drop the enclosing method call or list element.
    Ignore,
}

/// A reference to another service by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Target service id (a definition or an alias).
    pub id: String,
    /// Behaviour when the target is missing.
    pub invalid_behavior: InvalidBehavior,
}

impl Reference {
    /// A reference that fails when its target is missing.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            invalid_behavior: InvalidBehavior::Exception,
        }
    }

    pub fn with_behavior(id: impl Into<String>, invalid_behavior: InvalidBehavior) -> Self {
        Self {
            id: id.into(),
            invalid_behavior,
        }
    }

    /// A reference whose enclosing call is dropped when the target is missing.
    pub fn ignore_on_invalid(id: impl Into<String>) -> Self {
        Self::with_behavior(id, InvalidBehavior::Ignore)
    }

    /// A reference replaced by `null` when the target is missing.
    pub fn null_on_invalid(id: impl Into<String>) -> Self {
        Self::with_behavior(id, InvalidBehavior::Null)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.invalid_behavior {
            InvalidBehavior::Ignore => write!(f, "@?{}", self.id),
            _ => write!(f, "@{}", self.id),
        }
    }
}

/// A node of an argument tree.
///
/// `ServiceClosure` and `Iterator` are lazy: the services they reference are not
/// needed to construct the holder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Reference(Reference),
    Inline(Box<Definition>),
    ServiceClosure(Box<Value>),
    Iterator(Vec<Value>),
}

impl Value {
    /// Shorthand for `Value::Reference(Reference::new(id))`.
    pub fn reference(id: impl Into<String>) -> Self {
        Self::Reference(Reference::new(id))
    }

    /// A lazy closure around a reference to `id`.
    pub fn closure(id: impl Into<String>) -> Self {
        Self::ServiceClosure(Box::new(Self::reference(id)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Name of the value's type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) | Self::Map(_) => "array",
            Self::Reference(_) => "reference",
            Self::Inline(_) => "definition",
            Self::ServiceClosure(_) => "closure",
            Self::Iterator(_) => "iterator",
        }
    }

    /// Whether an argument slot holding this value counts as not supplied.
    #[must_use]
    pub fn is_empty_argument(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }

    /// Whether the value can be injected by type (null, reference or inline definition).
    #[must_use]
    pub fn is_injectable_by_type(&self) -> bool {
        matches!(self, Self::Null | Self::Reference(_) | Self::Inline(_))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Render a scalar the way it appears when interpolated into a string.
    #[must_use]
    pub fn to_interpolated(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(true) => Some("1".to_string()),
            Self::Bool(false) => Some(String::new()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Self::Reference(r)
    }
}

impl From<Definition> for Value {
    fn from(d: Definition) -> Self {
        Self::Inline(Box::new(d))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) if s.starts_with('@') => serializer.serialize_str(&format!("@{s}")),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Reference(r) if r.invalid_behavior == InvalidBehavior::Null => {
                let mut inner = IndexMap::new();
                inner.insert("id", r.id.as_str());
                inner.insert("on_invalid", "null");
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("!ref", &inner)?;
                map.end()
            }
            Self::Reference(r) => serializer.serialize_str(&r.to_string()),
            Self::Inline(definition) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("!service", definition)?;
                map.end()
            }
            Self::ServiceClosure(inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("!closure", inner)?;
                map.end()
            }
            Self::Iterator(items) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("!iterator", items)?;
                map.end()
            }
        }
    }
}

/// Key of an argument: a position, or a `$name` / type-hint key awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentKey {
    Index(usize),
    Named(String),
}

impl ArgumentKey {
    /// Indices come first in ascending order; named keys keep their relative order.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Index(a), Self::Index(b)) => a.cmp(b),
            (Self::Index(_), Self::Named(_)) => Ordering::Less,
            (Self::Named(_), Self::Index(_)) => Ordering::Greater,
            (Self::Named(_), Self::Named(_)) => Ordering::Equal,
        }
    }

    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Named(_) => None,
        }
    }
}

impl From<usize> for ArgumentKey {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for ArgumentKey {
    fn from(s: &str) -> Self {
        Self::Named(s.to_string())
    }
}

impl From<String> for ArgumentKey {
    fn from(s: String) -> Self {
        Self::Named(s)
    }
}

impl fmt::Display for ArgumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Ordered argument list of a constructor, method call or factory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments(IndexMap<ArgumentKey, Value>);

impl Arguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments `0..values.len()`.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self(
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (ArgumentKey::Index(i), v))
                .collect(),
        )
    }

    pub fn get(&self, key: &ArgumentKey) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.0.get(&ArgumentKey::Index(index))
    }

    /// Insert or replace, returning the previous value.
    pub fn set(&mut self, key: impl Into<ArgumentKey>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Append at the next position after the highest index.
    pub fn push(&mut self, value: Value) {
        let next = self.0.keys().filter_map(ArgumentKey::index).max().map_or(0, |i| i + 1);
        self.0.insert(ArgumentKey::Index(next), value);
    }

    pub fn remove(&mut self, key: &ArgumentKey) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains(&self, key: &ArgumentKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArgumentKey, &Value)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.0.values_mut()
    }

    /// Whether the argument at `index` is present and not empty.
    pub fn is_supplied(&self, index: usize) -> bool {
        self.get_index(index).is_some_and(|v| !v.is_empty_argument())
    }

    /// Named keys still awaiting resolution.
    pub fn named_keys(&self) -> Vec<String> {
        self.0
            .keys()
            .filter_map(|k| match k {
                ArgumentKey::Named(name) => Some(name.clone()),
                ArgumentKey::Index(_) => None,
            })
            .collect()
    }

    /// Sort keys: indices ascending, then named keys in insertion order.
    pub fn sort_keys(&mut self) {
        self.0.sort_by(|a, _, b, _| a.sort_cmp(b));
    }

    /// First missing position below the highest index, if any.
    pub fn first_gap(&self) -> Option<usize> {
        let mut indices: Vec<usize> = self.0.keys().filter_map(ArgumentKey::index).collect();
        indices.sort_unstable();
        indices.iter().enumerate().find(|(expected, actual)| expected != *actual).map(|(i, _)| i)
    }

    /// Rebuild from a transformed list of entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (ArgumentKey, Value)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn into_entries(self) -> impl Iterator<Item = (ArgumentKey, Value)> {
        self.0.into_iter()
    }

    fn is_sequential(&self) -> bool {
        self.0.keys().enumerate().all(|(i, k)| *k == ArgumentKey::Index(i))
    }
}

impl Serialize for Arguments {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_sequential() {
            let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
            for value in self.0.values() {
                seq.serialize_element(value)?;
            }
            seq.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.0.len()))?;
            for (key, value) in &self.0 {
                map.serialize_entry(&key.to_string(), value)?;
            }
            map.end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_keys_puts_indices_first() {
        let mut args = Arguments::new();
        args.set("$b", Value::Int(1));
        args.set(2, Value::Int(2));
        args.set("Logger", Value::Null);
        args.set(0, Value::Int(0));
        args.sort_keys();

        let keys: Vec<String> = args.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "2", "$b", "Logger"]);
    }

    #[test]
    fn test_first_gap() {
        let mut args = Arguments::from_values([Value::Int(0), Value::Int(1)]);
        assert_eq!(args.first_gap(), None);
        args.set(3, Value::Int(3));
        assert_eq!(args.first_gap(), Some(2));

        let mut only_two = Arguments::new();
        only_two.set(2, Value::Null);
        assert_eq!(only_two.first_gap(), Some(0));
    }

    #[test]
    fn test_push_after_highest_index() {
        let mut args = Arguments::new();
        args.set(3, Value::Null);
        args.push(Value::Int(1));
        assert_eq!(args.get_index(4), Some(&Value::Int(1)));
    }

    #[test]
    fn test_empty_string_is_not_supplied() {
        let args = Arguments::from_values([Value::string(""), Value::Null]);
        assert!(!args.is_supplied(0));
        assert!(args.is_supplied(1));
        assert!(!args.is_supplied(2));
    }

    #[test]
    fn test_value_serialization_syntax() {
        let value = Value::List(vec![
            Value::reference("mailer"),
            Value::Reference(Reference::ignore_on_invalid("cache")),
            Value::string("@literal"),
            Value::closure("logger"),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"["@mailer","@?cache","@@literal",{"!closure":"@logger"}]"#);
    }

    #[test]
    fn test_null_reference_serializes_as_table() {
        let value = Value::Reference(Reference::null_on_invalid("cache"));
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"!ref":{"id":"cache","on_invalid":"null"}}"#);
    }

    #[test]
    fn test_named_arguments_serialize_as_map() {
        let mut args = Arguments::from_values([Value::Int(1)]);
        args.set("$name", Value::string("x"));
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"{"0":1,"$name":"x"}"#);
    }
}
