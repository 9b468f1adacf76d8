//! Command-line interface for diwire.
//!
//! # Available Commands
//!
//! - `compile` - Compile a container file and dump the result as JSON or YAML
//! - `validate` - Compile a container file and report whether it is valid
//! - `list` - List the services and aliases of a container file
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--verbose` - Enable debug output (and the compiler log for `validate`)
//! - `--quiet` - Suppress all output except errors
//! - `--config` - Path to a compiler configuration file
//!
//! `RUST_LOG` takes precedence over `--verbose`/`--quiet` when set.
//!
//! # Example
//!
//! ```bash
//! diwire validate config/services.toml
//! diwire compile config/services.toml --format yaml --output var/container.yaml
//! diwire list config/services.toml --tag kernel.event_listener --compiled
//! ```

pub mod common;
mod compile;
mod list;
pub mod validate;


pub use compile::CompileCommand;
pub use list::ListCommand;
pub use validate::{OutputFormat, ValidateCommand};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `EnvFilter` directive; `None` disables logging.
    pub log_level: Option<String>,

    pub config_path: Option<PathBuf>,

    pub verbose: bool,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tracing subscriber on stderr. Does nothing when a subscriber is
    /// already installed.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(level)
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "diwire",
    about = "Compile and validate dependency-injection container definitions",
    version,
    long_about = "diwire loads service definitions from TOML, YAML or JSON files, runs them through \
                  the compiler pipeline (parameters, bindings, listeners, workflows, reference checks) \
                  and reports the first configuration error."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the compiler configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a container file and dump the result
    Compile(CompileCommand),

    /// Check that a container file compiles
    Validate(ValidateCommand),

    /// List services and aliases
    List(ListCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("diwire=debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("diwire=warn".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            verbose: self.verbose,
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Compile(cmd) => cmd.execute(config.config_path).await,
            Commands::Validate(cmd) => cmd.execute(config.config_path, config.verbose).await,
            Commands::List(cmd) => cmd.execute(config.config_path).await,
        }
    }
}
