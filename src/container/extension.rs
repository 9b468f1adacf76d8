//! Extensions: named configuration namespaces that contribute definitions.
//!
//! Configuration given under a namespace is collected on the container builder and
//! handed to the matching extension during the merge stage. Each extension loads into
//! a fresh temporary container which is then merged back.

use anyhow::Result;
use indexmap::IndexMap;
use std::fmt::Debug;

use super::ContainerBuilder;
use crate::definition::Value;

pub trait Extension: Debug + Send + Sync {
    /// The configuration namespace handled by this extension.
    fn alias(&self) -> &str;

    /// Runs before any extension loads. Typically prepends configuration for other
    /// extensions through [`ContainerBuilder::prepend_extension_config`].
    fn prepend(&self, _container: &mut ContainerBuilder) -> Result<()> {
        Ok(())
    }

    /// Turn the configuration list (one entry per configuration source, placeholders
    /// already resolved) into definitions, aliases and parameters.
    fn load(&self, configs: &[Value], container: &mut ContainerBuilder) -> Result<()>;
}

/// Exposes its configuration as parameters.
///
/// Configuration maps are deep-merged in order, then every top-level key `k` becomes the
/// parameter `<alias>.k`.
#[derive(Debug, Clone)]
pub struct ParameterExtension {
    alias: String,
}

impl ParameterExtension {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }
}

impl Extension for ParameterExtension {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn load(&self, configs: &[Value], container: &mut ContainerBuilder) -> Result<()> {
        let mut merged = IndexMap::new();
        for config in configs {
            match config {
                Value::Map(entries) => deep_merge(&mut merged, entries),
                Value::Null => {}
                other => anyhow::bail!(
                    "configuration for \"{}\" must be a table, {} given",
                    self.alias,
                    other.type_name()
                ),
            }
        }

        for (key, value) in merged {
            container.set_parameter(format!("{}.{key}", self.alias), value)?;
        }
        Ok(())
    }
}

/// Merge `overlay` into `base`; nested tables merge, everything else is replaced.
pub fn deep_merge(base: &mut IndexMap<String, Value>, overlay: &IndexMap<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Map(existing)), Value::Map(incoming)) => deep_merge(existing, incoming),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
