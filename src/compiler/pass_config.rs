//! Ordered registry of compiler passes.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use super::CompilerPass;
use super::check_arguments::CheckArgumentsValidityPass;
use super::check_circular::CheckCircularReferencesPass;
use super::check_invalid_references::CheckExceptionOnInvalidReferenceBehaviorPass;
use super::debug_dump::DumpDebugContainerPass;
use super::definition_errors::DefinitionErrorExceptionPass;
use super::logger_aware::LoggerAwarePass;
use super::merge_extension::MergeExtensionConfigurationPass;
use super::property_info::PropertyInfoPass;
use super::register_listeners::RegisterListenersPass;
use super::remove_definitions::{RemoveAbstractDefinitionsPass, RemoveUnusedDefinitionsPass};
use super::resolve_aliases::ResolveReferencesToAliasesPass;
use super::resolve_bindings::ResolveBindingsPass;
use super::resolve_invalid_references::ResolveInvalidReferencesPass;
use super::resolve_named_arguments::ResolveNamedArgumentsPass;
use super::resolve_parameters::ResolveParameterPlaceholdersPass;
use super::serializer::SerializerPass;
use super::validate_workflows::ValidateWorkflowsPass;
use crate::config::CompilerConfig;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Merge,
    BeforeOptimization,
    Optimization,
    BeforeRemoving,
    Removing,
    AfterRemoving,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Merge => "merge",
            Self::BeforeOptimization => "before-optimization",
            Self::Optimization => "optimization",
            Self::BeforeRemoving => "before-removing",
            Self::Removing => "removing",
            Self::AfterRemoving => "after-removing",
        };
        f.write_str(name)
    }
}

struct Entry {
    stage: Stage,
    priority: i32,
    pass: Box<dyn CompilerPass>,
}

/// Passes ordered by stage, then descending priority, then insertion.
#[derive(Default)]
pub struct PassConfig {
    entries: Vec<Entry>,
}

impl PassConfig {
    /// A configuration without any pass.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default pipeline.
    pub fn new(config: &CompilerConfig) -> Self {
        let debug_dump = match config.debug_dump_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("Ignoring debug dump path: {e:#}");
                None
            }
        };

        let mut passes = Self::empty();
        passes.add_pass(Box::new(MergeExtensionConfigurationPass::new()), Stage::Merge, 0);

        let optimization: Vec<Box<dyn CompilerPass>> = vec![
            Box::new(ResolveParameterPlaceholdersPass::new()),
            Box::new(ResolveNamedArgumentsPass::new()),
            Box::new(ResolveBindingsPass::new()),
            Box::new(RegisterListenersPass::new(config.event_dispatcher.clone())),
            Box::new(SerializerPass::new()),
            Box::new(PropertyInfoPass::new()),
            Box::new(LoggerAwarePass::new(config.logger.clone())),
            Box::new(ValidateWorkflowsPass::new(config.workflow.definition_tag.clone())),
            Box::new(ResolveReferencesToAliasesPass::new()),
            Box::new(ResolveInvalidReferencesPass::new()),
            Box::new(CheckCircularReferencesPass::new()),
            Box::new(CheckArgumentsValidityPass::new()),
        ];
        for pass in optimization {
            passes.add_pass(pass, Stage::Optimization, 0);
        }

        passes.add_pass(Box::new(RemoveAbstractDefinitionsPass::new()), Stage::Removing, 0);
        passes.add_pass(Box::new(RemoveUnusedDefinitionsPass::new()), Stage::Removing, 0);
        passes.add_pass(Box::new(DefinitionErrorExceptionPass::new()), Stage::Removing, 0);

        passes.add_pass(
            Box::new(CheckExceptionOnInvalidReferenceBehaviorPass::new()),
            Stage::AfterRemoving,
            0,
        );
        passes.add_pass(Box::new(DumpDebugContainerPass::new(debug_dump)), Stage::AfterRemoving, 0);
        passes
    }

    pub fn add_pass(&mut self, pass: Box<dyn CompilerPass>, stage: Stage, priority: i32) {
        self.entries.push(Entry {
            stage,
            priority,
            pass,
        });
        self.entries
            .sort_by(|a, b| a.stage.cmp(&b.stage).then_with(|| b.priority.cmp(&a.priority)));
    }

    /// Remove every pass named `name`. Returns how many were removed.
    pub fn remove_pass(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.pass.name() != name);
        before - self.entries.len()
    }

    /// `(stage, name)` of every pass in execution order.
    pub fn passes(&self) -> Vec<(Stage, String)> {
        self.entries.iter().map(|e| (e.stage, e.pass.name().to_string())).collect()
    }

    pub(super) fn ordered_mut(&mut self) -> impl Iterator<Item = (Stage, &mut Box<dyn CompilerPass>)> {
        self.entries.iter_mut().map(|e| (e.stage, &mut e.pass))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
