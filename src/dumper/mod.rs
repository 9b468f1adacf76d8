//! Serialisation of a container for inspection and caching.
//!
//! The dump holds parameters, definitions and aliases in registration order. `%%`
//! escapes left in definitions are turned into literal `%` so the output shows what
//! a runtime container would receive.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use crate::container::ContainerBuilder;
use crate::container::parameter_bag::unescape_definition;
use crate::core::{DiError, Result};
use crate::definition::{Alias, Definition, Value};
use crate::utils::compute_checksum;

/// Output format of a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DumpFormat {
    #[default]
    Json,
    Yaml,
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContainerDump<'a> {
    pub compiled: bool,
    pub parameters: &'a IndexMap<String, Value>,
    pub services: IndexMap<&'a str, Definition>,
    pub aliases: &'a IndexMap<String, Alias>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compiler_log: Vec<&'a str>,
}

pub struct Dumper<'a> {
    container: &'a ContainerBuilder,
    include_log: bool,
}

impl<'a> Dumper<'a> {
    pub fn new(container: &'a ContainerBuilder) -> Self {
        Self {
            container,
            include_log: false,
        }
    }

    /// Also dump the compiler log.
    #[must_use]
    pub fn with_log(mut self, include_log: bool) -> Self {
        self.include_log = include_log;
        self
    }

    pub fn snapshot(&self) -> ContainerDump<'a> {
        let container = self.container;
        ContainerDump {
            compiled: container.is_compiled(),
            parameters: container.parameters().all(),
            services: container
                .definitions()
                .iter()
                .map(|(id, definition)| (id.as_str(), unescape_definition(definition)))
                .collect(),
            aliases: container.aliases(),
            compiler_log: if self.include_log {
                container.compiler_log().iter().map(String::as_str).collect()
            } else {
                Vec::new()
            },
        }
    }

    pub fn dump(&self, format: DumpFormat) -> Result<String> {
        let snapshot = self.snapshot();
        let serialization = |reason: String| DiError::Serialization {
            format: format.to_string(),
            reason,
        };
        match format {
            DumpFormat::Json => {
                serde_json::to_string_pretty(&snapshot).map_err(|e| serialization(e.to_string()))
            }
            DumpFormat::Yaml => serde_yaml::to_string(&snapshot).map_err(|e| serialization(e.to_string())),
        }
    }

    /// `sha256:` digest of the JSON dump, stable for identical containers.
    pub fn checksum(&self) -> Result<String> {
        Ok(compute_checksum(self.dump(DumpFormat::Json)?.as_bytes()))
    }
}
