//! Gives logger-aware services a `setLogger` call.

use tracing::debug;

use super::CompilerPass;
use crate::config::LoggerConfig;
use crate::constants::SET_LOGGER_METHOD;
use crate::container::ContainerBuilder;
use crate::core::Result;
use crate::definition::Value;

/// Adds `setLogger(@logger)` to every tagged service whose class implements the
/// logger-aware interface. Services that already call `setLogger`, or whose class
/// is unknown or lacks the interface, are left alone.
#[derive(Debug, Clone)]
pub struct LoggerAwarePass {
    /// Tag, interface and logger service id to use.
    config: LoggerConfig,
}

impl LoggerAwarePass {
    pub fn new(config: LoggerConfig) -> Self {
        Self { config }
    }
}

impl CompilerPass for LoggerAwarePass {
    fn name(&self) -> &'static str {
        "LoggerAwarePass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        if !container.has(&self.config.service) {
            return Ok(());
        }

        let mut wired = Vec::new();
        for service_id in container.find_tagged_service_ids(&self.config.tag, false)?.into_keys() {
            let Some(definition) = container.definition(&service_id) else {
                continue;
            };
            if definition.has_method_call(SET_LOGGER_METHOD) {
                continue;
            }
            let implements = match &definition.class {
                Some(class) => container
                    .reflection_class(class)?
                    .is_some_and(|m| container.classes().implements(&m.name, &self.config.interface)),
                None => false,
            };
            if !implements {
                debug!("\"{}\" is tagged {} but not logger aware", service_id, self.config.tag);
                continue;
            }
            wired.push(service_id);
        }

        for service_id in &wired {
            if let Some(definition) = container.definition_mut(service_id) {
                definition.add_method_call(SET_LOGGER_METHOD, vec![Value::reference(self.config.service.clone())]);
            }
        }
        container.log(self.name(), format!("{} services", wired.len()));
        Ok(())
    }
}
