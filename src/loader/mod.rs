//! Loading container configuration files.
//!
//! A container file is TOML, YAML or JSON, picked by extension. Its top-level keys:
//!
//! ```toml
//! imports = ["services/*.toml"]
//!
//! [parameters]
//! sender = "noreply@example.com"
//!
//! [defaults]
//! public = false
//! bind = { "$projectDir" = "%kernel.project_dir%" }
//!
//! [classes."App.Mailer"]
//! constructor = [{ name = "transport", type = "App.Transport" }]
//!
//! [services.mailer]
//! class = "App.Mailer"
//! arguments = ["@transport", "%sender%"]
//! tags = ["logger.aware"]
//!
//! [aliases]
//! "App.Mailer" = "mailer"
//!
//! [framework]            # any other key is configuration for that extension
//! secret = "s3cr3t"
//! ```
//!
//! Imports are resolved relative to the importing file and loaded before it, so a file
//! overrides what it imports. Import patterns may contain wildcards; matches load in
//! sorted order. A file already loaded is skipped; importing a file that is still being
//! loaded is an error.

pub mod raw;

use anyhow::{Context, Result, bail};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::container::ContainerBuilder;
use crate::definition::Alias;
use raw::{RawAlias, RawFile, apply_defaults, build_definition, plain_value};

/// Loads container files into a [`ContainerBuilder`].
pub struct FileLoader<'c> {
    container: &'c mut ContainerBuilder,
    stack: Vec<PathBuf>,
    loaded: HashSet<PathBuf>,
}

impl<'c> FileLoader<'c> {
    pub fn new(container: &'c mut ContainerBuilder) -> Self {
        Self {
            container,
            stack: Vec::new(),
            loaded: HashSet::new(),
        }
    }

    /// Load `path` and everything it imports.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Cannot find container file: {}", path.display()))?;

        if self.stack.contains(&path) {
            let chain: Vec<String> = self
                .stack
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.display().to_string())
                .collect();
            bail!("Circular import: {}", chain.join(" -> "));
        }
        if !self.loaded.insert(path.clone()) {
            debug!("Skipping already loaded file: {}", path.display());
            return Ok(());
        }

        self.stack.push(path.clone());
        let result = self.load_file(&path);
        self.stack.pop();
        result
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let raw = parse_file(path)?;
        debug!("Loading container file: {}", path.display());

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for import in &raw.imports {
            for file in expand_import(base, import)? {
                self.load(&file)
                    .with_context(|| format!("Failed to import \"{import}\" from {}", path.display()))?;
            }
        }

        self.apply(raw)
            .with_context(|| format!("Invalid container file: {}", path.display()))?;
        self.container.add_resource(path.display().to_string());
        Ok(())
    }

    fn apply(&mut self, raw: RawFile) -> Result<()> {
        for (name, value) in &raw.parameters {
            self.container.set_parameter(name.clone(), plain_value(value))?;
        }

        for (name, mut metadata) in raw.classes {
            metadata.name = name;
            self.container.classes_mut().register(metadata);
        }

        for (id, service) in raw.services {
            let service = service.unwrap_or_default();
            let public = service.public;
            let mut definition =
                build_definition(Some(&id), service).with_context(|| format!("Invalid service \"{id}\""))?;
            apply_defaults(&mut definition, public, &raw.defaults)
                .with_context(|| format!("Invalid defaults for service \"{id}\""))?;
            self.container.set_definition(id, definition);
        }

        for (name, alias) in raw.aliases {
            let alias = match alias {
                RawAlias::Target(target) => Alias::new(target),
                RawAlias::Full { service, public } => Alias::new(service).with_public(public),
            };
            self.container.set_alias(name, alias)?;
        }

        for (namespace, config) in &raw.extensions {
            self.container.load_from_extension(namespace, plain_value(config))?;
        }
        Ok(())
    }
}

/// Load a single file with its imports.
pub fn load_file(container: &mut ContainerBuilder, path: &Path) -> Result<()> {
    FileLoader::new(container).load(path)
}

fn parse_file(path: &Path) -> Result<RawFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read container file: {}", path.display()))?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let document: JsonValue = match extension {
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML in {}", path.display()))?,
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in {}", path.display()))?,
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON in {}", path.display()))?,
        other => bail!(
            "Unsupported container file extension \"{other}\" for {} (expected toml, yaml, yml or json)",
            path.display()
        ),
    };

    if document.is_null() {
        return Ok(RawFile::default());
    }
    serde_json::from_value(document).with_context(|| format!("Invalid container file layout in {}", path.display()))
}

fn expand_import(base: &Path, import: &str) -> Result<Vec<PathBuf>> {
    let expanded = shellexpand::tilde(import);
    let candidate = Path::new(expanded.as_ref());
    let full = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };

    if !import.contains(['*', '?', '[']) {
        return Ok(vec![full]);
    }

    let pattern = full.to_string_lossy().to_string();
    let mut files = glob::glob(&pattern)
        .with_context(|| format!("Invalid import pattern: {import}"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to expand import pattern: {import}"))?;
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Extension, ParameterExtension};
    use crate::definition::{BindingOrigin, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_toml_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write(
            &dir,
            "services.toml",
            r#"
[parameters]
sender = "noreply@example.com"

[defaults]
public = true
bind = { "$env" = "prod" }

[classes."App.Mailer"]
constructor = [{ name = "transport", type = "App.Transport" }]

[services.mailer]
class = "App.Mailer"
arguments = ["@transport", "%sender%"]
tags = [{ name = "kernel.event_listener", event = "mail.sent" }]

[services."App.Transport"]

[services.hidden]
class = "App.Hidden"
public = false

[aliases]
transport = "App.Transport"
"#,
        );

        let mut container = ContainerBuilder::new();
        load_file(&mut container, &path)?;

        assert_eq!(container.parameter("sender")?, &Value::from("noreply@example.com"));
        assert!(container.classes().has("App.Mailer"));

        let mailer = container.find_definition("mailer")?;
        assert!(mailer.public);
        assert_eq!(mailer.arguments.get_index(0), Some(&Value::reference("transport")));
        assert_eq!(mailer.bindings["$env"].origin(), BindingOrigin::Defaults);
        assert!(!container.find_definition("hidden")?.public);
        assert_eq!(
            container.find_definition("App.Transport")?.class.as_deref(),
            Some("App.Transport")
        );
        assert_eq!(container.alias("transport").map(Alias::target), Some("App.Transport"));
        assert_eq!(container.resources().len(), 1);
        Ok(())
    }

    #[test]
    fn test_imports_load_first_and_glob_sorted() -> Result<()> {
        let dir = TempDir::new()?;
        write(&dir, "conf/b.yaml", "services:\n  b:\n    class: B\nparameters:\n  who: b\n");
        write(&dir, "conf/a.yaml", "services:\n  a:\n    class: A\nparameters:\n  who: a\n");
        let main = write(
            &dir,
            "main.yaml",
            "imports: ['conf/*.yaml']\nservices:\n  a:\n    class: Overridden\n",
        );

        let mut container = ContainerBuilder::new();
        load_file(&mut container, &main)?;

        assert_eq!(container.parameter("who")?, &Value::from("b"));
        assert_eq!(container.find_definition("a")?.class.as_deref(), Some("Overridden"));
        assert_eq!(container.definition_ids(), vec!["a".to_string(), "b".to_string()]);
        Ok(())
    }

    #[test]
    fn test_circular_import() -> Result<()> {
        let dir = TempDir::new()?;
        write(&dir, "a.toml", "imports = [\"b.toml\"]\n");
        let b = write(&dir, "b.toml", "imports = [\"a.toml\"]\n");

        let mut container = ContainerBuilder::new();
        let err = load_file(&mut container, &b).unwrap_err();
        assert!(format!("{err:#}").contains("Circular import"));
        Ok(())
    }

    #[test]
    fn test_diamond_import_loads_once() -> Result<()> {
        let dir = TempDir::new()?;
        write(&dir, "shared.toml", "[services.shared]\nclass = \"Shared\"\n");
        write(&dir, "left.toml", "imports = [\"shared.toml\"]\n");
        write(&dir, "right.toml", "imports = [\"shared.toml\"]\n");
        let main = write(&dir, "main.toml", "imports = [\"left.toml\", \"right.toml\"]\n");

        let mut container = ContainerBuilder::new();
        load_file(&mut container, &main)?;
        assert_eq!(container.resources().len(), 4);
        Ok(())
    }

    #[test]
    fn test_extension_configuration() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write(&dir, "app.json", r#"{"framework": {"secret": "s3cr3t"}, "unknown": {}}"#);

        let mut container = ContainerBuilder::new();
        let extension: Arc<dyn Extension> = Arc::new(ParameterExtension::new("framework"));
        container.register_extension(extension)?;

        let err = load_file(&mut container, &path).unwrap_err();
        assert!(format!("{err:#}").contains("unknown"));
        assert_eq!(container.extension_config("framework").len(), 1);
        Ok(())
    }

    #[test]
    fn test_unsupported_extension() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write(&dir, "services.ini", "a = b");
        let mut container = ContainerBuilder::new();
        let err = load_file(&mut container, &path).unwrap_err();
        assert!(err.to_string().contains("Unsupported container file extension"));
        Ok(())
    }
}
