//! Extension loading through the merge stage.

use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

use diwire::compiler::merge_extension::MergeExtensionConfigurationPass;
use diwire::compiler::{Compiler, CompilerPass};
use diwire::container::{ContainerBuilder, Extension, ParameterExtension};
use diwire::core::{DiError, Result};
use diwire::definition::{Definition, Value};

/// Registers one public service per configured entry of its `services` list.
#[derive(Debug)]
struct ServicesExtension;

impl Extension for ServicesExtension {
    fn alias(&self) -> &str {
        "services_ext"
    }

    fn load(&self, configs: &[Value], container: &mut ContainerBuilder) -> anyhow::Result<()> {
        for config in configs {
            let Value::Map(entries) = config else {
                anyhow::bail!("expected a table");
            };
            if let Some(Value::List(ids)) = entries.get("services") {
                for id in ids.iter().filter_map(Value::as_str) {
                    container.set_definition(id, Definition::new("App.Generated").with_public(true));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct BrokenExtension;

impl Extension for BrokenExtension {
    fn alias(&self) -> &str {
        "broken"
    }

    fn load(&self, _configs: &[Value], _container: &mut ContainerBuilder) -> anyhow::Result<()> {
        anyhow::bail!("bad configuration")
    }
}

/// Prepends defaults for the `framework` namespace.
#[derive(Debug)]
struct PresetExtension;

impl Extension for PresetExtension {
    fn alias(&self) -> &str {
        "preset"
    }

    fn prepend(&self, container: &mut ContainerBuilder) -> anyhow::Result<()> {
        let defaults: IndexMap<String, Value> =
            [("locale".to_string(), Value::from("en")), ("debug".to_string(), Value::from(false))]
                .into_iter()
                .collect();
        container.prepend_extension_config("framework", Value::Map(defaults));
        Ok(())
    }

    fn load(&self, _configs: &[Value], _container: &mut ContainerBuilder) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Registers `generated.one` and records every configuration list it is handed.
#[derive(Debug, Default)]
struct RecordingExtension {
    received: Mutex<Vec<Value>>,
}

impl Extension for RecordingExtension {
    fn alias(&self) -> &str {
        "recording"
    }

    fn load(&self, configs: &[Value], container: &mut ContainerBuilder) -> anyhow::Result<()> {
        if let Ok(mut received) = self.received.lock() {
            received.extend(configs.iter().cloned());
        }
        container.set_definition("generated.one", Definition::new("App.Generated").with_public(true));
        Ok(())
    }
}

/// Prepends a `mode` entry for `recording` and notes whether any loaded definition
/// was already visible.
#[derive(Debug, Default)]
struct LatePrepender {
    saw_loaded_definition: Mutex<Option<bool>>,
}

impl Extension for LatePrepender {
    fn alias(&self) -> &str {
        "late"
    }

    fn prepend(&self, container: &mut ContainerBuilder) -> anyhow::Result<()> {
        if let Ok(mut saw) = self.saw_loaded_definition.lock() {
            *saw = Some(container.has_definition("generated.one"));
        }
        container.prepend_extension_config("recording", table(&[("mode", Value::from("prepended"))]));
        Ok(())
    }

    fn load(&self, _configs: &[Value], _container: &mut ContainerBuilder) -> anyhow::Result<()> {
        Ok(())
    }
}

fn table(pairs: &[(&str, Value)]) -> Value {
    Value::Map(pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect())
}

#[test]
fn test_extension_definitions_are_merged() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.register_extension(Arc::new(ServicesExtension))?;
    assert!(container.has_extension("services_ext"));
    container.load_from_extension(
        "services_ext",
        table(&[("services", Value::List(vec![Value::from("generated.one")]))]),
    )?;

    Compiler::new().compile(&mut container)?;

    assert!(container.has_definition("generated.one"));
    Ok(())
}

#[test]
fn test_user_definitions_win_over_extensions() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.register_extension(Arc::new(ServicesExtension))?;
    container.set_definition("generated.one", Definition::new("App.Custom").with_public(true));
    container.load_from_extension(
        "services_ext",
        table(&[("services", Value::List(vec![Value::from("generated.one")]))]),
    )?;

    Compiler::new().compile(&mut container)?;

    assert_eq!(container.find_definition("generated.one")?.class.as_deref(), Some("App.Custom"));
    Ok(())
}

#[test]
fn test_failed_extension_keeps_earlier_merges() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.register_extension(Arc::new(ServicesExtension))?;
    container.register_extension(Arc::new(BrokenExtension))?;
    container.load_from_extension(
        "services_ext",
        table(&[("services", Value::List(vec![Value::from("generated.one")]))]),
    )?;
    container.load_from_extension("broken", Value::Null)?;

    let err = Compiler::new().compile(&mut container).unwrap_err();
    assert!(matches!(err, DiError::ExtensionLoadFailed { ref extension, .. } if extension == "broken"));
    assert!(err.to_string().contains("bad configuration"));
    assert!(container.has_definition("generated.one"));
    assert!(!container.is_compiled());
    Ok(())
}

#[test]
fn test_unknown_namespace_is_rejected() {
    let mut container = ContainerBuilder::new();
    let err = container.load_from_extension("framework", Value::Null).unwrap_err();
    assert_eq!(
        err.to_string(),
        "There is no extension able to load the configuration for \"framework\". Looked for namespace \"framework\", found none."
    );
}

fn preset_container() -> Result<ContainerBuilder> {
    let mut container = ContainerBuilder::new();
    container.register_extension(Arc::new(PresetExtension))?;
    container.register_extension(Arc::new(ParameterExtension::new("framework")))?;
    container.load_from_extension("framework", table(&[("locale", Value::from("fr"))]))?;
    Ok(container)
}

#[test]
fn test_prepended_config_is_overridden_and_stable() -> Result<()> {
    let mut first = preset_container()?;
    let mut second = preset_container()?;
    Compiler::new().compile(&mut first)?;
    Compiler::new().compile(&mut second)?;

    assert_eq!(first.parameter("framework.locale")?, &Value::from("fr"));
    assert_eq!(first.parameter("framework.debug")?, &Value::from(false));
    assert_eq!(first.parameters().all(), second.parameters().all());
    Ok(())
}

#[test]
fn test_every_prepend_runs_before_any_load() -> Result<()> {
    let recording = Arc::new(RecordingExtension::default());
    let late = Arc::new(LatePrepender::default());

    let mut container = ContainerBuilder::new();
    container.register_extension(recording.clone())?;
    container.register_extension(late.clone())?;
    container.load_from_extension("recording", table(&[("mode", Value::from("user"))]))?;

    Compiler::new().compile(&mut container)?;

    let received = recording.received.lock().map(|r| r.clone()).unwrap_or_default();
    assert_eq!(
        received,
        vec![
            table(&[("mode", Value::from("prepended"))]),
            table(&[("mode", Value::from("user"))]),
        ]
    );
    assert_eq!(late.saw_loaded_definition.lock().map(|s| *s).unwrap_or_default(), Some(false));
    assert!(container.has_definition("generated.one"));
    Ok(())
}

#[test]
fn test_merging_twice_on_one_container_is_stable() -> Result<()> {
    let mut container = preset_container()?;

    MergeExtensionConfigurationPass::new().process(&mut container)?;
    let first = container.parameters().all().clone();
    MergeExtensionConfigurationPass::new().process(&mut container)?;

    assert_eq!(container.parameters().all(), &first);
    assert_eq!(container.parameter("framework.locale")?, &Value::from("fr"));
    assert_eq!(container.parameter("framework.debug")?, &Value::from(false));
    Ok(())
}
