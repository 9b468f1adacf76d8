//! Injects tagged normalizers and encoders into the serializer.
//!
//! Skipped entirely when no `serializer` service is registered.

use tracing::debug;

use super::CompilerPass;
use super::priority::find_and_sort_tagged_services;
use crate::constants::{SERIALIZER_ENCODER_TAG, SERIALIZER_NORMALIZER_TAG, SERIALIZER_SERVICE};
use crate::container::ContainerBuilder;
use crate::core::{DiError, Result};
use crate::definition::Value;

/// Normalizers go to argument 0 of the serializer, encoders to argument 1, both
/// highest priority first. The serializer cannot work without either list.
///
/// Fails with [`DiError::NoTaggedServices`] when either tag has no services, and
/// with [`DiError::InvalidTagAttribute`] for a malformed `priority`.
#[derive(Debug, Default)]
pub struct SerializerPass;

impl SerializerPass {
    pub fn new() -> Self {
        Self
    }

    fn collect(container: &ContainerBuilder, tag: &str) -> Result<Vec<Value>> {
        let services = find_and_sort_tagged_services(container, tag)?;
        if services.is_empty() {
            return Err(DiError::NoTaggedServices {
                tag: tag.to_string(),
                service: SERIALIZER_SERVICE.to_string(),
            });
        }
        Ok(services)
    }
}

impl CompilerPass for SerializerPass {
    fn name(&self) -> &'static str {
        "SerializerPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        if !container.has_definition(SERIALIZER_SERVICE) {
            return Ok(());
        }

        let normalizers = Self::collect(container, SERIALIZER_NORMALIZER_TAG)?;
        let encoders = Self::collect(container, SERIALIZER_ENCODER_TAG)?;
        debug!("Serializer gets {} normalizers and {} encoders", normalizers.len(), encoders.len());
        let summary = format!("{} normalizers, {} encoders", normalizers.len(), encoders.len());

        if let Some(serializer) = container.definition_mut(SERIALIZER_SERVICE) {
            serializer.set_argument(0, Value::List(normalizers));
            serializer.set_argument(1, Value::List(encoders));
            serializer.arguments.sort_keys();
        }
        container.log(self.name(), summary);
        Ok(())
    }
}
