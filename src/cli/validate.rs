//! Validate a container file by compiling it.
//!
//! The command exits successfully only when every compiler pass succeeds. With
//! `--format json` a machine-readable report goes to stdout in both cases, which
//! makes the command usable as a CI step:
//!
//! ```bash
//! diwire validate config/services.toml --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::common::compile_file;

/// Output format for validation results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// A single JSON object on stdout.
    Json,
}

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Container file (TOML, YAML or JSON)
    pub file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Report printed with `--format json`.
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub file: String,
    pub services: usize,
    pub aliases: usize,
    pub parameters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compiler_log: Vec<String>,
}

impl ValidateCommand {
    /// `verbose` adds the compiler log to the output.
    pub async fn execute(self, config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
        let mut report = ValidationReport {
            file: self.file.display().to_string(),
            ..ValidationReport::default()
        };

        let container = match compile_file(&self.file, config_path).await {
            Ok(container) => container,
            Err(e) => {
                if self.format == OutputFormat::Json {
                    report.error = Some(format!("{e:#}"));
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                return Err(e);
            }
        };

        report.valid = true;
        report.services = container.definitions().len();
        report.aliases = container.aliases().len();
        report.parameters = container.parameters().len();
        if verbose || self.format == OutputFormat::Json {
            report.compiler_log = container.compiler_log().to_vec();
        }

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_text(&report, verbose),
        }
        Ok(())
    }
}

fn print_text(report: &ValidationReport, verbose: bool) {
    println!("{} {} is valid", "✓".green(), report.file);
    println!("  Services: {}", report.services);
    println!("  Aliases: {}", report.aliases);
    println!("  Parameters: {}", report.parameters);

    if verbose && !report.compiler_log.is_empty() {
        println!("\n{}", "Compiler log:".bold());
        for entry in &report.compiler_log {
            println!("  {entry}");
        }
    }
}
