//! Compile a container file and dump the result.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::compile_file;
use crate::dumper::{DumpFormat, Dumper};

/// Command to compile a container file.
///
/// # Examples
///
/// ```bash
/// # Print the compiled container as JSON
/// diwire compile services.toml
///
/// # Write YAML to a file, compiler log included
/// diwire compile services.yaml --format yaml --output build/container.yaml --with-log
/// ```
#[derive(Args, Debug)]
pub struct CompileCommand {
    /// Container file (TOML, YAML or JSON)
    pub file: PathBuf,

    /// Output format of the dump
    #[arg(short, long, value_enum, default_value_t = DumpFormat::Json)]
    pub format: DumpFormat,

    /// Write the dump to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include the compiler log in the dump
    #[arg(long)]
    pub with_log: bool,
}

impl CompileCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let container = compile_file(&self.file, config_path).await?;
        let dump = Dumper::new(&container).with_log(self.with_log).dump(self.format)?;

        let Some(output) = self.output else {
            println!("{dump}");
            return Ok(());
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        tokio::fs::write(&output, dump)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;

        eprintln!(
            "{} Compiled {} services to {}",
            "✓".green(),
            container.definitions().len(),
            output.display()
        );
        Ok(())
    }
}
