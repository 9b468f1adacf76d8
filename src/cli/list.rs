//! List the services and aliases of a container file.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{compile_file, load_container};
use crate::container::ContainerBuilder;
use crate::definition::Definition;

#[derive(Args, Debug)]
pub struct ListCommand {
    /// Container file (TOML, YAML or JSON)
    pub file: PathBuf,

    /// Only list services carrying this tag, with their attributes
    #[arg(long)]
    pub tag: Option<String>,

    /// List what remains after compilation instead of what was declared
    #[arg(long)]
    pub compiled: bool,
}

impl ListCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let container = if self.compiled {
            compile_file(&self.file, config_path).await?
        } else {
            load_container(&self.file, config_path).await?.0
        };

        match &self.tag {
            Some(tag) => list_tagged(&container, tag)?,
            None => list_all(&container),
        }
        Ok(())
    }
}

fn list_all(container: &ContainerBuilder) {
    if container.definitions().is_empty() && container.aliases().is_empty() {
        println!("No services defined");
        return;
    }

    println!("{}", "Services:".bold());
    for (id, definition) in container.definitions() {
        println!("  {}", service_line(id, definition));
        let tags: Vec<&str> = definition.tags.keys().map(String::as_str).collect();
        if !tags.is_empty() {
            println!("      tags: {}", tags.join(", "));
        }
    }

    if !container.aliases().is_empty() {
        println!("\n{}", "Aliases:".bold());
        for (id, alias) in container.aliases() {
            let visibility = if alias.is_public() { " (public)" } else { "" };
            println!("  {} -> {}{}", id.cyan(), alias.target(), visibility);
        }
    }
}

fn list_tagged(container: &ContainerBuilder, tag: &str) -> Result<()> {
    let tagged = container.find_tagged_service_ids(tag, false)?;
    if tagged.is_empty() {
        println!("No services tagged \"{tag}\"");
        return Ok(());
    }

    println!("{}", format!("Services tagged \"{tag}\":").bold());
    for (id, occurrences) in &tagged {
        let definition = container.find_definition(id)?;
        println!("  {}", service_line(id, definition));
        for attributes in occurrences.iter().filter(|a| !a.is_empty()) {
            let rendered: Vec<String> = attributes
                .iter()
                .map(|(k, v)| format!("{k}={}", v.to_interpolated().unwrap_or_else(|| v.type_name().to_string())))
                .collect();
            println!("      {}", rendered.join(", "));
        }
    }
    Ok(())
}

fn service_line(id: &str, definition: &Definition) -> String {
    let mut line = format!("{} {}", id.cyan(), definition.class.as_deref().unwrap_or("-").dimmed());
    if definition.public {
        line.push_str(" (public)");
    }
    if definition.is_abstract {
        line.push_str(" (abstract)");
    }
    line
}
