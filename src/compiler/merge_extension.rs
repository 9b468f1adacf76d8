//! Loads extension configuration into the container.

use tracing::{debug, info};

use super::CompilerPass;
use crate::container::ContainerBuilder;
use crate::core::{DiError, Result};
use crate::definition::Value;

/// Runs every extension's prepend step, then loads each extension that received
/// configuration into its own temporary container and merges it back.
///
/// Definitions and aliases that existed before the merge are re-applied at the end,
/// so user configuration wins over what extensions register. If an extension fails,
/// the containers of the extensions loaded before it stay merged.
#[derive(Debug, Default)]
pub struct MergeExtensionConfigurationPass;

impl MergeExtensionConfigurationPass {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerPass for MergeExtensionConfigurationPass {
    fn name(&self) -> &'static str {
        "MergeExtensionConfigurationPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        let parameters = container.parameters().all().clone();
        let definitions = container.definitions().clone();
        let aliases = container.aliases().clone();
        let extensions = container.extensions();

        for extension in &extensions {
            extension
                .prepend(container)
                .map_err(|e| DiError::extension_load_failed(extension.alias(), e))?;
        }

        for extension in &extensions {
            let alias = extension.alias();
            let configs = container.extension_config(alias).to_vec();
            if configs.is_empty() {
                continue;
            }

            let resolved: Vec<Value> = configs
                .iter()
                .map(|config| container.parameters().resolve_value(config))
                .collect::<Result<_>>()?;

            let mut temporary = container.new_for_extension(alias, container.parameters().clone());
            extension
                .load(&resolved, &mut temporary)
                .map_err(|e| DiError::extension_load_failed(alias, e))?;

            debug!(
                "Extension \"{}\" registered {} definitions",
                alias,
                temporary.definitions().len()
            );
            container.merge(temporary)?;
            container.parameters_mut().add(&parameters)?;
            container.log(self.name(), format!("loaded extension \"{alias}\""));
        }

        container.add_definitions(definitions);
        container.add_aliases(aliases)?;

        if !extensions.is_empty() {
            info!("Merged configuration of {} extensions", extensions.len());
        }
        Ok(())
    }
}
