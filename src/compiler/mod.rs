//! The compiler: an ordered pipeline of passes over a [`ContainerBuilder`].
//!
//! Passes run stage by stage (see [`Stage`]): extension configuration is merged first,
//! then placeholders, named arguments and bindings are resolved, the tagged-service
//! collectors wire aggregates, workflows are validated, references are normalised and
//! checked, and finally unused definitions are removed and the remaining references
//! are verified.
//!
//! The first failing pass aborts compilation. There is no partial result: the error
//! names the offending service and the configuration must be fixed.
//!
//! # Examples
//!
//! ```rust
//! use diwire::compiler::Compiler;
//! use diwire::container::ContainerBuilder;
//! use diwire::definition::{Definition, Value};
//!
//! # fn main() -> diwire::core::Result<()> {
//! let mut container = ContainerBuilder::new();
//! container.set_definition(
//!     "mailer",
//!     Definition::new("App.Mailer").with_argument(Value::from("%sender%")).with_public(true),
//! );
//! container.set_parameter("sender", Value::from("noreply@example.com"))?;
//!
//! Compiler::new().compile(&mut container)?;
//!
//! let mailer = container.find_definition("mailer")?;
//! assert_eq!(mailer.arguments.get_index(0), Some(&Value::from("noreply@example.com")));
//! # Ok(())
//! # }
//! ```

pub mod check_arguments;
pub mod check_circular;
pub mod check_invalid_references;
pub mod debug_dump;
pub mod definition_errors;
pub mod logger_aware;
pub mod merge_extension;
pub mod pass_config;
pub mod priority;
pub mod property_info;
pub mod reference_graph;
pub mod register_listeners;
pub mod remove_definitions;
pub mod resolve_aliases;
pub mod resolve_bindings;
pub mod resolve_invalid_references;
pub mod resolve_named_arguments;
pub mod resolve_parameters;
pub mod serializer;
pub mod validate_workflows;
pub mod visitor;

pub use pass_config::{PassConfig, Stage};
pub use priority::find_and_sort_tagged_services;
pub use visitor::{RecursivePass, VisitContext};

use tracing::{debug, info};

use crate::config::CompilerConfig;
use crate::container::ContainerBuilder;
use crate::core::{DiError, Result};

/// One transformation or check over the whole container.
pub trait CompilerPass {
    /// Name used in logs and in [`Compiler::passes`].
    fn name(&self) -> &'static str;

    /// Transform or check `container` in place.
    ///
    /// # Errors
    ///
    /// Any error stops the compilation. Changes already made to the container are
    /// kept, so a failed container should not be compiled again.
    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()>;
}

/// Runs the passes of a [`PassConfig`] in stage and priority order.
pub struct Compiler {
    pass_config: PassConfig,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// The default pipeline with default settings.
    pub fn new() -> Self {
        Self::with_config(&CompilerConfig::default())
    }

    pub fn with_config(config: &CompilerConfig) -> Self {
        Self {
            pass_config: PassConfig::new(config),
        }
    }

    /// A compiler running exactly the given passes.
    pub fn with_pass_config(pass_config: PassConfig) -> Self {
        Self { pass_config }
    }

    pub fn add_pass(&mut self, pass: impl CompilerPass + 'static, stage: Stage, priority: i32) {
        self.pass_config.add_pass(Box::new(pass), stage, priority);
    }

    pub fn pass_config(&self) -> &PassConfig {
        &self.pass_config
    }

    /// `(stage, name)` of every pass in execution order.
    pub fn passes(&self) -> Vec<(Stage, String)> {
        self.pass_config.passes()
    }

    /// Run every pass, then resolve and freeze the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DiError::AlreadyCompiled`] for a container that was compiled before.
    /// Otherwise the first error raised by a pass, or by parameter resolution, is
    /// returned unchanged and the remaining passes are not run.
    pub fn compile(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        if container.is_compiled() {
            return Err(DiError::AlreadyCompiled);
        }

        info!(
            "Compiling container with {} definitions and {} aliases",
            container.definitions().len(),
            container.aliases().len()
        );

        for (stage, pass) in self.pass_config.ordered_mut() {
            let name = pass.name();
            let span = tracing::debug_span!("pass", pass = name, %stage);
            let _guard = span.enter();

            debug!("Running {}", name);
            pass.process(container)?;
            container.log(name, format!("completed ({stage})"));
        }

        container.freeze()?;
        info!("Container compiled: {} definitions remain", container.definitions().len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Definition, Value};

    struct Failing;

    impl CompilerPass for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn process(&mut self, _container: &mut ContainerBuilder) -> Result<()> {
            Err(DiError::Other {
                message: "boom".to_string(),
            })
        }
    }

    struct Marker;

    impl CompilerPass for Marker {
        fn name(&self) -> &'static str {
            "Marker"
        }

        fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
            container.register("marker", "App.Marker").public = true;
            Ok(())
        }
    }

    #[test]
    fn test_compile_twice_fails() -> Result<()> {
        let mut container = ContainerBuilder::new();
        Compiler::new().compile(&mut container)?;
        assert!(container.is_compiled());
        assert!(matches!(Compiler::new().compile(&mut container), Err(DiError::AlreadyCompiled)));
        Ok(())
    }

    #[test]
    fn test_failing_pass_aborts() {
        let mut container = ContainerBuilder::new();
        let mut compiler = Compiler::new();
        compiler.add_pass(Failing, Stage::BeforeOptimization, 0);

        let err = compiler.compile(&mut container).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(!container.is_compiled());
        assert!(container.compiler_log().iter().any(|l| l.starts_with("MergeExtensionConfigurationPass")));
        assert!(!container.compiler_log().iter().any(|l| l.starts_with("ResolveBindingsPass")));
    }

    #[test]
    fn test_user_pass_runs_in_stage() -> Result<()> {
        let mut container = ContainerBuilder::new();
        let mut compiler = Compiler::new();
        compiler.add_pass(Marker, Stage::BeforeRemoving, 0);
        compiler.compile(&mut container)?;

        assert!(container.has_definition("marker"));
        let passes = compiler.passes();
        let marker = passes.iter().position(|(_, n)| n == "Marker").unwrap_or(usize::MAX);
        let removing = passes.iter().position(|(s, _)| *s == Stage::Removing).unwrap_or(0);
        assert!(marker < removing);
        Ok(())
    }

    #[test]
    fn test_custom_pass_config_runs_only_its_passes() -> Result<()> {
        let mut passes = PassConfig::empty();
        passes.add_pass(Box::new(Marker), Stage::Optimization, 0);
        let mut compiler = Compiler::with_pass_config(passes);

        let mut container = ContainerBuilder::new();
        container.set_definition("orphan", Definition::new("App.Orphan"));
        compiler.compile(&mut container)?;

        assert_eq!(compiler.passes().len(), 1);
        assert!(container.has_definition("marker"));
        assert!(container.has_definition("orphan"));
        Ok(())
    }

    #[test]
    fn test_parameters_are_frozen_after_compile() -> Result<()> {
        let mut container = ContainerBuilder::new();
        container.set_parameter("a", Value::from("%%b"))?;
        container.set_definition("s", Definition::new("S").with_public(true));
        Compiler::new().compile(&mut container)?;

        assert_eq!(container.parameter("a")?, &Value::from("%b"));
        assert!(container.parameters().is_frozen());
        Ok(())
    }
}
