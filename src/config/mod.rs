//! Compiler configuration
//!
//! [`CompilerConfig`] controls the names the built-in passes look for (dispatcher
//! service, listener tags, workflow tag, logger service), which events are frozen,
//! and where the debug dump of the compiled container is written.
//!
//! # Location
//!
//! The configuration is read from, in order of precedence:
//! 1. The `--config` CLI flag
//! 2. The `DIWIRE_CONFIG_PATH` environment variable
//! 3. `~/.diwire/config.toml` (`%LOCALAPPDATA%\diwire\config.toml` on Windows)
//!
//! A missing file yields the defaults. `DIWIRE_DEBUG_DUMP` and `DIWIRE_FROZEN_EVENTS`
//! (comma separated) override the corresponding settings after loading.
//!
//! ```toml
//! debug_dump = "~/.cache/diwire/container.json"
//! parameter_extensions = ["framework"]
//!
//! [event_dispatcher]
//! service = "event_dispatcher"
//! frozen_events = ["kernel.request"]
//!
//! [workflow]
//! definition_tag = "workflow.definition"
//!
//! [logger]
//! service = "logger"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants;

/// Settings of the listener registration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDispatcherConfig {
    /// Default dispatcher service id.
    pub service: String,
    pub listener_tag: String,
    pub subscriber_tag: String,
    /// Parameter holding a map of event aliases.
    pub aliases_parameter: String,
    /// Events whose listener list is fixed at compile time.
    pub frozen_events: Vec<String>,
    /// Parameter types too generic to infer an event name from.
    pub generic_event_types: Vec<String>,
}

impl Default for EventDispatcherConfig {
    fn default() -> Self {
        Self {
            service: constants::EVENT_DISPATCHER_SERVICE.to_string(),
            listener_tag: constants::EVENT_LISTENER_TAG.to_string(),
            subscriber_tag: constants::EVENT_SUBSCRIBER_TAG.to_string(),
            aliases_parameter: constants::EVENT_ALIASES_PARAMETER.to_string(),
            frozen_events: Vec::new(),
            generic_event_types: constants::GENERIC_EVENT_TYPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub definition_tag: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            definition_tag: constants::WORKFLOW_DEFINITION_TAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub service: String,
    pub tag: String,
    pub interface: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            service: constants::LOGGER_SERVICE.to_string(),
            tag: constants::LOGGER_AWARE_TAG.to_string(),
            interface: constants::LOGGER_AWARE_INTERFACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Where to write the compiled container as JSON after compilation.
    /// `~` and environment variables are expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_dump: Option<String>,

    /// Configuration namespaces exposed as parameters by a
    /// [`crate::container::ParameterExtension`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameter_extensions: Vec<String>,

    pub event_dispatcher: EventDispatcherConfig,
    pub workflow: WorkflowConfig,
    pub logger: LoggerConfig,
}

impl CompilerConfig {
    /// Load from `path` when given, else from the default location. A missing file
    /// yields the defaults. Environment overrides are applied either way.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            debug!("No compiler config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read compiler config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse compiler config from {}", path.display()))
    }

    /// `DIWIRE_CONFIG_PATH`, else `~/.diwire/config.toml`
    /// (`%LOCALAPPDATA%\diwire\config.toml` on Windows).
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(constants::CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("diwire")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".diwire")
        };

        Ok(config_dir.join("config.toml"))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dump) = lookup(constants::DEBUG_DUMP_ENV).filter(|v| !v.trim().is_empty()) {
            self.debug_dump = Some(dump);
        }

        if let Some(events) = lookup(constants::FROZEN_EVENTS_ENV) {
            self.event_dispatcher.frozen_events = events
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// The expanded debug dump path, if one is configured.
    pub fn debug_dump_path(&self) -> Result<Option<PathBuf>> {
        let Some(raw) = &self.debug_dump else {
            return Ok(None);
        };

        let expanded = shellexpand::full(raw)
            .with_context(|| format!("Failed to expand debug dump path: {raw}"))?;
        Ok(Some(PathBuf::from(expanded.into_owned())))
    }
}
