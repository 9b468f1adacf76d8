//! Rejects services that need themselves to be constructed.

use super::CompilerPass;
use super::reference_graph::ReferenceGraph;
use crate::container::ContainerBuilder;
use crate::core::{DiError, Result};

/// Fails on a cycle of construction-time references. References wrapped in
/// closures or iterators, injected through properties or method calls, or ignored
/// when missing do not count.
#[derive(Debug, Default)]
pub struct CheckCircularReferencesPass;

impl CheckCircularReferencesPass {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerPass for CheckCircularReferencesPass {
    fn name(&self) -> &'static str {
        "CheckCircularReferencesPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        let graph = ReferenceGraph::build(container);
        if let Some(path) = graph.detect_cycles() {
            return Err(DiError::CircularReference {
                service_id: path.first().cloned().unwrap_or_default(),
                path,
            });
        }
        container.log(
            self.name(),
            format!("{} services, {} references", graph.node_count(), graph.edge_count()),
        );
        Ok(())
    }
}
