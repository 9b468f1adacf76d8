//! Injects tagged extractors into the property-info service.
//!
//! The five extractor tags map to arguments 0 through 4 in this order: list,
//! type, description, access and initializable. A tag nobody uses still yields an
//! empty iterator at its position. Skipped when no `property_info` service exists.

use super::CompilerPass;
use super::priority::find_and_sort_tagged_services;
use crate::constants::{PROPERTY_INFO_SERVICE, PROPERTY_INFO_TAGS};
use crate::container::ContainerBuilder;
use crate::core::Result;
use crate::definition::Value;

/// Each extractor tag fills one argument of the property-info service, as a lazy
/// iterator so extractors are only built when first used.
#[derive(Debug, Default)]
pub struct PropertyInfoPass;

impl PropertyInfoPass {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerPass for PropertyInfoPass {
    fn name(&self) -> &'static str {
        "PropertyInfoPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        if !container.has_definition(PROPERTY_INFO_SERVICE) {
            return Ok(());
        }

        let mut extractors = Vec::with_capacity(PROPERTY_INFO_TAGS.len());
        for tag in PROPERTY_INFO_TAGS {
            extractors.push(find_and_sort_tagged_services(container, tag)?);
        }
        let count: usize = extractors.iter().map(Vec::len).sum();

        if let Some(property_info) = container.definition_mut(PROPERTY_INFO_SERVICE) {
            for (position, services) in extractors.into_iter().enumerate() {
                property_info.set_argument(position, Value::Iterator(services));
            }
            property_info.arguments.sort_keys();
        }
        container.log(self.name(), format!("{count} extractors"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Definition;
    use crate::definition::tag::attributes;

    #[test]
    fn test_each_tag_fills_its_argument() -> Result<()> {
        let mut container = ContainerBuilder::new();
        container.register("property_info", "PropertyInfoExtractor");
        container.set_definition(
            "reflection",
            Definition::new("ReflectionExtractor")
                .with_tag("property_info.list_extractor")
                .with_tag("property_info.type_extractor")
                .with_tag("property_info.access_extractor")
                .with_tag("property_info.initializable_extractor"),
        );
        container.set_definition(
            "phpdoc",
            Definition::new("DocExtractor")
                .with_tag_attributes("property_info.type_extractor", attributes([("priority", -1i64)]))
                .with_tag("property_info.description_extractor"),
        );

        PropertyInfoPass::new().process(&mut container)?;

        let service = container.find_definition("property_info")?;
        assert_eq!(service.arguments.len(), 5);
        assert_eq!(
            service.arguments.get_index(1),
            Some(&Value::Iterator(vec![Value::reference("reflection"), Value::reference("phpdoc")]))
        );
        assert_eq!(
            service.arguments.get_index(2),
            Some(&Value::Iterator(vec![Value::reference("phpdoc")]))
        );
        Ok(())
    }

    #[test]
    fn test_empty_tags_give_empty_iterators() -> Result<()> {
        let mut container = ContainerBuilder::new();
        container.register("property_info", "PropertyInfoExtractor");

        PropertyInfoPass::new().process(&mut container)?;

        let service = container.find_definition("property_info")?;
        assert!(service.arguments.values().all(|v| *v == Value::Iterator(Vec::new())));
        Ok(())
    }
}
