//! Checks every tagged workflow definition at compile time.

use std::collections::HashMap;

use super::CompilerPass;
use crate::container::ContainerBuilder;
use crate::core::{DiError, Result};
use crate::definition::WorkflowTag;
use crate::workflow::{DefinitionValidator, ValidationStrategy, WorkflowDefinition};

/// Every occurrence of the definition tag must carry `name`, `type` and
/// `marking_store`; all tags are checked before any workflow is validated. The
/// validator is picked from `type` and `marking_store` and reused across services.
pub struct ValidateWorkflowsPass {
    /// Tag marking workflow definition services.
    tag: String,
    /// Built on first use, one per strategy.
    validators: HashMap<ValidationStrategy, Box<dyn DefinitionValidator>>,
}

impl ValidateWorkflowsPass {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            validators: HashMap::new(),
        }
    }
}

impl CompilerPass for ValidateWorkflowsPass {
    fn name(&self) -> &'static str {
        "ValidateWorkflowsPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        let mut workflows = Vec::new();
        for (service_id, occurrences) in container.find_tagged_service_ids(&self.tag, true)? {
            for attributes in &occurrences {
                let tag = WorkflowTag::from_attributes(attributes, &self.tag, &service_id)?;
                workflows.push((service_id.clone(), tag));
            }
        }

        for (service_id, tag) in &workflows {
            let invalid = |source| DiError::InvalidWorkflow {
                workflow: tag.name.clone(),
                service_id: service_id.clone(),
                source,
            };

            let definition = container.find_definition(service_id)?;
            let workflow = WorkflowDefinition::from_service(container, definition).map_err(invalid)?;

            let strategy = ValidationStrategy::for_tag(&tag.workflow_type, &tag.marking_store);
            let validator = self.validators.entry(strategy).or_insert_with(|| strategy.validator());
            validator.validate(&workflow, &tag.name).map_err(invalid)?;
        }

        container.log(self.name(), format!("{} workflows validated", workflows.len()));
        Ok(())
    }
}
