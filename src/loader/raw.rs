//! Raw shapes of container files and their conversion into definitions.
//!
//! Files are parsed into [`serde_json::Value`] first (TOML and YAML alike), then
//! deserialised into the structs below. Values inside arguments, properties, calls
//! and bindings go through [`parse_value`], which understands the reference syntax:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `"@id"` | reference to `id` |
//! | `"@?id"` | reference ignored when `id` is missing |
//! | `"@@text"` | the literal string `@text` |
//! | `{ "!ref" = { id = "x", on_invalid = "null" } }` | reference with explicit behaviour |
//! | `{ "!service" = { ... } }` | inline definition |
//! | `{ "!closure" = "@id" }` | lazy closure |
//! | `{ "!iterator" = [...] }` | lazy iterator |

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::container::ClassMetadata;
use crate::definition::{
    ArgumentKey, Arguments, Binding, BindingOrigin, Definition, Factory, InvalidBehavior, MethodCall,
    Reference, TagAttributes, Value,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFile {
    pub imports: Vec<String>,
    pub parameters: IndexMap<String, JsonValue>,
    pub defaults: RawDefaults,
    pub classes: IndexMap<String, ClassMetadata>,
    pub services: IndexMap<String, Option<RawService>>,
    pub aliases: IndexMap<String, RawAlias>,
    /// Every other top-level key: configuration for the extension of that name.
    #[serde(flatten)]
    pub extensions: IndexMap<String, JsonValue>,
}

/// Settings applied to every service of the same file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawDefaults {
    pub public: Option<bool>,
    pub tags: Vec<RawTag>,
    pub bind: IndexMap<String, JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawService {
    pub class: Option<String>,
    pub arguments: Option<JsonValue>,
    pub calls: Vec<RawCall>,
    pub properties: IndexMap<String, JsonValue>,
    pub factory: Option<RawFactory>,
    pub bind: IndexMap<String, JsonValue>,
    pub tags: Vec<RawTag>,
    pub public: Option<bool>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub synthetic: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawFactory {
    /// `"Class::method"` or `"@service::method"`
    Short(String),
    Class { class: String, method: String },
    Service { service: String, method: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTag {
    Name(String),
    Attributes(IndexMap<String, JsonValue>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawAlias {
    Target(String),
    Full {
        service: String,
        #[serde(default)]
        public: bool,
    },
}

/// A parameter or extension value: plain data, no reference syntax.
pub fn plain_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or_default())),
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(plain_value).collect()),
        JsonValue::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), plain_value(v)))
                .collect(),
        ),
    }
}

/// A value that may contain references, inline definitions and lazy wrappers.
pub fn parse_value(json: &JsonValue) -> Result<Value> {
    Ok(match json {
        JsonValue::String(s) => parse_string(s),
        JsonValue::Array(items) => Value::List(items.iter().map(parse_value).collect::<Result<_>>()?),
        JsonValue::Object(entries) => match entries.iter().next() {
            Some((key, inner)) if entries.len() == 1 && key.starts_with('!') => parse_tagged(key, inner)?,
            _ => parse_map(entries)?,
        },
        other => plain_value(other),
    })
}

fn parse_tagged(tag: &str, inner: &JsonValue) -> Result<Value> {
    Ok(match tag {
        "!ref" => parse_reference(inner)?,
        "!service" => {
            let raw: RawService =
                serde_json::from_value(inner.clone()).context("Invalid inline service definition")?;
            Value::Inline(Box::new(build_definition(None, raw)?))
        }
        "!closure" => match parse_value(inner)? {
            reference @ Value::Reference(_) => Value::ServiceClosure(Box::new(reference)),
            other => bail!("!closure expects a reference, got {}", other.type_name()),
        },
        "!iterator" => match parse_value(inner)? {
            Value::List(items) => Value::Iterator(items),
            other => bail!("!iterator expects a list, got {}", other.type_name()),
        },
        other => bail!("Unknown value tag \"{other}\""),
    })
}

fn parse_map(entries: &serde_json::Map<String, JsonValue>) -> Result<Value> {
    let mut map = IndexMap::with_capacity(entries.len());
    for (key, value) in entries {
        map.insert(key.clone(), parse_value(value)?);
    }
    Ok(Value::Map(map))
}

fn parse_string(s: &str) -> Value {
    if let Some(literal) = s.strip_prefix("@@") {
        Value::String(format!("@{literal}"))
    } else if let Some(id) = s.strip_prefix("@?") {
        Value::Reference(Reference::ignore_on_invalid(id))
    } else if let Some(id) = s.strip_prefix('@').filter(|id| !id.is_empty()) {
        Value::reference(id)
    } else {
        Value::String(s.to_string())
    }
}

fn parse_reference(json: &JsonValue) -> Result<Value> {
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct RawReference {
        id: String,
        #[serde(default)]
        on_invalid: InvalidBehavior,
    }

    let raw: RawReference = match json {
        JsonValue::String(id) => RawReference {
            id: id.clone(),
            on_invalid: InvalidBehavior::Exception,
        },
        other => serde_json::from_value(other.clone()).context("Invalid !ref")?,
    };
    Ok(Value::Reference(Reference::with_behavior(raw.id, raw.on_invalid)))
}

/// Positional lists, or tables keyed by position, `$name` or type.
pub fn parse_arguments(json: Option<&JsonValue>) -> Result<Arguments> {
    match json {
        None | Some(JsonValue::Null) => Ok(Arguments::new()),
        Some(JsonValue::Array(items)) => Ok(Arguments::from_values(
            items.iter().map(parse_value).collect::<Result<Vec<_>>>()?,
        )),
        Some(JsonValue::Object(entries)) => {
            let mut arguments = Arguments::new();
            for (key, value) in entries {
                let key = match key.parse::<usize>() {
                    Ok(index) => ArgumentKey::Index(index),
                    Err(_) => ArgumentKey::Named(key.clone()),
                };
                arguments.set(key, parse_value(value)?);
            }
            arguments.sort_keys();
            Ok(arguments)
        }
        Some(other) => Err(anyhow!("arguments must be a list or a table, got {other}")),
    }
}

pub fn parse_tag(tag: &RawTag) -> Result<(String, TagAttributes)> {
    match tag {
        RawTag::Name(name) => Ok((name.clone(), TagAttributes::new())),
        RawTag::Attributes(entries) if entries.len() == 1 && !entries.contains_key("name") => {
            let Some((name, JsonValue::Object(attributes))) = entries.first() else {
                bail!("a tag table needs a non-empty \"name\"");
            };
            let attributes = attributes.iter().map(|(key, value)| (key.clone(), plain_value(value))).collect();
            Ok((name.clone(), attributes))
        }
        RawTag::Attributes(entries) => {
            let name = entries
                .get("name")
                .and_then(JsonValue::as_str)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| anyhow!("a tag table needs a non-empty \"name\""))?;
            let attributes = entries
                .iter()
                .filter(|(key, _)| key.as_str() != "name")
                .map(|(key, value)| (key.clone(), plain_value(value)))
                .collect();
            Ok((name.to_string(), attributes))
        }
    }
}

fn parse_factory(factory: RawFactory) -> Result<Factory> {
    match factory {
        RawFactory::Short(short) => {
            let (target, method) = short
                .split_once("::")
                .ok_or_else(|| anyhow!("factory \"{short}\" must look like \"Class::method\" or \"@service::method\""))?;
            Ok(match target.strip_prefix('@') {
                Some(service) => Factory::service(service, method),
                None => Factory::class(target, method),
            })
        }
        RawFactory::Class { class, method } => Ok(Factory::class(class, method)),
        RawFactory::Service { service, method } => Ok(Factory::service(service, method)),
    }
}

/// Build a definition. A service declared without a body uses its id as class.
pub fn build_definition(id: Option<&str>, raw: RawService) -> Result<Definition> {
    let mut definition = Definition {
        class: raw.class.or_else(|| id.map(str::to_string)),
        arguments: parse_arguments(raw.arguments.as_ref())?,
        is_abstract: raw.is_abstract,
        synthetic: raw.synthetic,
        public: raw.public.unwrap_or(false),
        ..Definition::default()
    };

    for call in raw.calls {
        definition.calls.push(MethodCall {
            arguments: parse_arguments(call.arguments.as_ref())
                .with_context(|| format!("Invalid arguments for call \"{}\"", call.method))?,
            method: call.method,
        });
    }
    for (name, value) in &raw.properties {
        definition.set_property(name.clone(), parse_value(value)?);
    }
    if let Some(factory) = raw.factory {
        definition.set_factory(parse_factory(factory)?);
    }
    for (key, value) in &raw.bind {
        definition.bind(key.clone(), parse_value(value)?);
    }
    for tag in &raw.tags {
        let (name, attributes) = parse_tag(tag)?;
        definition.add_tag(name, attributes);
    }
    Ok(definition)
}

/// Apply file defaults to a definition built from `raw`.
pub fn apply_defaults(definition: &mut Definition, raw_public: Option<bool>, defaults: &RawDefaults) -> Result<()> {
    if raw_public.is_none()
        && let Some(public) = defaults.public
    {
        definition.public = public;
    }
    for tag in &defaults.tags {
        let (name, attributes) = parse_tag(tag)?;
        if !definition.has_tag(&name) {
            definition.add_tag(name, attributes);
        }
    }
    for (key, value) in &defaults.bind {
        if !definition.bindings.contains_key(key) {
            definition.set_binding(
                key.clone(),
                Binding::with_origin(parse_value(value)?, BindingOrigin::Defaults),
            );
        }
    }
    Ok(())
}
