//! Loading and compiling a container file for the commands.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::compiler::Compiler;
use crate::config::CompilerConfig;
use crate::container::{ContainerBuilder, ParameterExtension};
use crate::loader::load_file;

/// Read the compiler configuration and load `file` into a fresh container, with a
/// [`ParameterExtension`] registered for every configured namespace.
pub async fn load_container(file: &Path, config_path: Option<PathBuf>) -> Result<(ContainerBuilder, CompilerConfig)> {
    let config = CompilerConfig::load_with_optional(config_path).await?;

    let mut container = ContainerBuilder::new();
    for namespace in &config.parameter_extensions {
        container.register_extension(Arc::new(ParameterExtension::new(namespace.as_str())))?;
    }

    load_file(&mut container, file)?;
    debug!(
        "Loaded {} definitions and {} aliases from {}",
        container.definitions().len(),
        container.aliases().len(),
        file.display()
    );
    Ok((container, config))
}

/// [`load_container`], then compile with the configured pipeline.
pub async fn compile_file(file: &Path, config_path: Option<PathBuf>) -> Result<ContainerBuilder> {
    let (mut container, config) = load_container(file, config_path).await?;
    Compiler::with_config(&config)
        .compile(&mut container)
        .with_context(|| format!("Failed to compile {}", file.display()))?;
    Ok(container)
}
