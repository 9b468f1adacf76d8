//! diwire - a dependency-injection container compiler
//!
//! diwire takes a set of service definitions (classes, constructor arguments, method
//! calls, tags, bindings, aliases and parameters), runs them through an ordered
//! pipeline of compiler passes and produces a resolved, validated container graph.
//! Configuration mistakes (unknown services, circular references, unused bindings,
//! malformed workflows) are reported at compile time with the offending service id.
//!
//! # Architecture Overview
//!
//! - A [`container::ContainerBuilder`] holds definitions, aliases, parameters,
//!   class metadata and extension configuration.
//! - The [`compiler::Compiler`] runs [`compiler::CompilerPass`]es stage by stage,
//!   each pass mutating the builder in place. The first error aborts compilation.
//! - Files are read by [`loader::FileLoader`]; compiled containers are written by
//!   [`dumper::Dumper`].
//!
//! # Core Modules
//!
//! - [`definition`] - Definitions, values, references, bindings, tags and aliases
//! - [`container`] - The container builder, parameter bag, class registry and extensions
//! - [`compiler`] - The pass pipeline and every built-in pass
//! - [`workflow`] - Workflow definitions and their validators
//! - [`loader`] - TOML/YAML/JSON container files
//! - [`dumper`] - JSON/YAML serialisation of a container
//! - [`config`] - Compiler configuration (`~/.diwire/config.toml`)
//! - [`core`] - Error types and user-facing error rendering
//! - [`cli`] - The `diwire` command-line interface
//!
//! # Example
//!
//! ```rust
//! use diwire::compiler::Compiler;
//! use diwire::container::{ClassMetadata, ContainerBuilder, Parameter};
//! use diwire::definition::{Definition, Value};
//!
//! # fn main() -> diwire::core::Result<()> {
//! let mut container = ContainerBuilder::new();
//! container.classes_mut().register(
//!     ClassMetadata::new("App.Mailer").with_constructor(vec![Parameter::typed("transport", "App.Transport")]),
//! );
//! container.register("App.Transport", "App.Transport");
//! container.set_definition(
//!     "mailer",
//!     Definition::new("App.Mailer")
//!         .with_binding("App.Transport", Value::reference("App.Transport"))
//!         .with_public(true),
//! );
//!
//! Compiler::new().compile(&mut container)?;
//!
//! let mailer = container.find_definition("mailer")?;
//! assert_eq!(mailer.arguments.get_index(0), Some(&Value::reference("App.Transport")));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod container;
pub mod core;
pub mod definition;
pub mod dumper;
pub mod loader;
pub mod utils;
pub mod workflow;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
