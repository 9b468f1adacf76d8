//! Files loaded through the library, then compiled and dumped.

use anyhow::Result;
use tempfile::TempDir;

use diwire::compiler::Compiler;
use diwire::container::ContainerBuilder;
use diwire::definition::Value;
use diwire::dumper::{DumpFormat, Dumper};
use diwire::loader::load_file;
use diwire::test_utils::ContainerFixture;

fn load_fixture(fixture: &ContainerFixture) -> Result<(TempDir, ContainerBuilder)> {
    let dir = TempDir::new()?;
    let path = fixture.write_to(dir.path())?;
    let mut container = ContainerBuilder::new();
    load_file(&mut container, &path)?;
    Ok((dir, container))
}

#[test]
fn test_basic_fixture_compiles() -> Result<()> {
    let (_dir, mut container) = load_fixture(&ContainerFixture::basic())?;
    assert!(container.has_definition("unused"));
    assert_eq!(container.resources().len(), 1);

    Compiler::new().compile(&mut container)?;

    assert!(!container.has_definition("unused"));
    assert_eq!(container.alias("app.mailer").map(|a| a.target()), Some("mailer"));
    let mailer = container.find_definition("mailer")?;
    assert_eq!(mailer.arguments.get_index(0), Some(&Value::reference("App.Transport")));
    assert_eq!(mailer.arguments.get_index(1), Some(&Value::from("noreply@example.com")));
    Ok(())
}

#[test]
fn test_yaml_and_json_files_load_the_same_container() -> Result<()> {
    let yaml = ContainerFixture::new(
        "services.yaml",
        r#"
parameters:
  greeting: hello
services:
  greeter:
    class: App.Greeter
    public: true
    arguments: ["%greeting%", 42]
"#,
    );
    let json = ContainerFixture::new(
        "services.json",
        r#"{
  "parameters": { "greeting": "hello" },
  "services": {
    "greeter": { "class": "App.Greeter", "public": true, "arguments": ["%greeting%", 42] }
  }
}"#,
    );

    let mut dumps = Vec::new();
    for fixture in [yaml, json] {
        let (_dir, mut container) = load_fixture(&fixture)?;
        Compiler::new().compile(&mut container)?;
        dumps.push(Dumper::new(&container).checksum()?);
    }
    assert_eq!(dumps[0], dumps[1]);
    Ok(())
}

#[test]
fn test_dump_checksum_changes_with_content() -> Result<()> {
    let (_dir, mut basic) = load_fixture(&ContainerFixture::basic())?;
    let (_other, mut listeners) = load_fixture(&ContainerFixture::listeners())?;
    Compiler::new().compile(&mut basic)?;
    Compiler::new().compile(&mut listeners)?;

    let checksum = Dumper::new(&basic).checksum()?;
    assert!(checksum.starts_with("sha256:"));
    assert_ne!(checksum, Dumper::new(&listeners).checksum()?);

    let yaml = Dumper::new(&basic).dump(DumpFormat::Yaml)?;
    assert!(yaml.contains("mailer:"));
    Ok(())
}

#[test]
fn test_resource_tracking_can_be_disabled() -> Result<()> {
    let dir = TempDir::new()?;
    let path = ContainerFixture::basic().write_to(dir.path())?;
    let mut container = ContainerBuilder::new();
    container.set_resource_tracking(false);
    assert!(!container.is_tracking_resources());

    load_file(&mut container, &path)?;
    assert!(container.resources().is_empty());
    assert!(container.has_definition("mailer"));
    Ok(())
}

#[test]
fn test_invalid_state_machine_fixture_fails() -> Result<()> {
    let (_dir, mut container) = load_fixture(&ContainerFixture::invalid_state_machine())?;
    let err = Compiler::new().compile(&mut container).unwrap_err();
    assert_eq!(err.service_id(), Some("workflow.article"));
    Ok(())
}
