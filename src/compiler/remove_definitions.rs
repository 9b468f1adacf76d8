//! Removal of definitions that will never be instantiated.

use tracing::debug;

use super::CompilerPass;
use super::reference_graph::ReferenceGraph;
use crate::container::ContainerBuilder;
use crate::core::Result;

/// Drops abstract definitions; they only serve as templates.
#[derive(Debug, Default)]
pub struct RemoveAbstractDefinitionsPass;

impl RemoveAbstractDefinitionsPass {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerPass for RemoveAbstractDefinitionsPass {
    fn name(&self) -> &'static str {
        "RemoveAbstractDefinitionsPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        let abstract_ids: Vec<String> = container
            .definitions()
            .iter()
            .filter(|(_, definition)| definition.is_abstract)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &abstract_ids {
            container.remove_definition(id);
        }
        container.log(self.name(), format!("removed {} abstract definitions", abstract_ids.len()));
        Ok(())
    }
}

/// Drops private aliases, then every private definition that cannot be reached from
/// a public or synthetic definition or a public alias.
#[derive(Debug, Default)]
pub struct RemoveUnusedDefinitionsPass;

impl RemoveUnusedDefinitionsPass {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerPass for RemoveUnusedDefinitionsPass {
    fn name(&self) -> &'static str {
        "RemoveUnusedDefinitionsPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        let private_aliases: Vec<String> = container
            .aliases()
            .iter()
            .filter(|(_, alias)| !alias.is_public())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &private_aliases {
            container.remove_alias(id);
        }

        let mut roots: Vec<String> = container
            .definitions()
            .iter()
            .filter(|(_, definition)| definition.public || definition.synthetic)
            .map(|(id, _)| id.clone())
            .collect();
        for alias in container.aliases().values() {
            roots.push(container.resolve_alias_target(alias.target())?);
        }

        let reachable = ReferenceGraph::build(container).reachable_from(roots.iter().map(String::as_str));
        let unused: Vec<String> = container
            .definition_ids()
            .into_iter()
            .filter(|id| !reachable.contains(id))
            .collect();

        for id in &unused {
            debug!("Removing unused definition \"{}\"", id);
            container.remove_definition(id);
        }
        container.log(
            self.name(),
            format!(
                "removed {} private aliases and {} unused definitions",
                private_aliases.len(),
                unused.len()
            ),
        );
        Ok(())
    }
}
