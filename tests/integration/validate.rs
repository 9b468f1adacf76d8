use diwire::test_utils::ContainerFixture;

use crate::common::TestProject;

#[test]
fn test_validate_valid_container() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::basic()).unwrap();

    let output = project.run_diwire(&["validate", "services.toml"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("✓"));
    assert!(output.stdout.contains("services.toml is valid"));
    assert!(output.stdout.contains("Services: 3"));
    assert!(output.stdout.contains("Aliases: 1"));
    assert!(output.stdout.contains("Parameters: 2"));
    assert!(!output.stdout.contains("Compiler log"));
}

#[test]
fn test_validate_verbose_prints_compiler_log() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::basic()).unwrap();

    let output = project.run_diwire(&["validate", "services.toml", "--verbose"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Compiler log:"));
    assert!(output.stdout.contains("ResolveBindingsPass"));
    assert!(output.stdout.contains("RemoveUnusedDefinitionsPass"));
}

#[test]
fn test_validate_json_report() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::basic()).unwrap();

    let output = project.run_diwire(&["validate", "services.toml", "--format", "json"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);

    let report: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(report["valid"], true);
    assert_eq!(report["services"], 3);
    assert_eq!(report["aliases"], 1);
    assert!(report.get("error").is_none());
    assert!(report["compiler_log"].as_array().is_some_and(|log| !log.is_empty()));
}

#[test]
fn test_validate_circular_reference() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::circular()).unwrap();

    let output = project.run_diwire(&["validate", "circular.toml"]).unwrap();
    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("Circular reference detected for service \"a\", path: \"a -> b -> a\"."));
    assert!(output.stderr.contains("suggestion"));
}

#[test]
fn test_validate_json_report_on_failure() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::circular()).unwrap();

    let output = project.run_diwire(&["validate", "circular.toml", "--format", "json"]).unwrap();
    assert!(!output.success);

    let report: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(report["valid"], false);
    assert!(report["error"].as_str().is_some_and(|e| e.contains("Circular reference")));
}

#[test]
fn test_validate_missing_reference_suggests_alternative() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::missing_reference()).unwrap();

    let output = project.run_diwire(&["validate", "missing.toml"]).unwrap();
    assert!(!output.success);
    assert!(
        output
            .stderr
            .contains("The service \"mailer\" has a dependency on a non-existent service \"transprt\".")
    );
    assert!(output.stderr.contains("Did you mean this: \"transport\"?"));
}

#[test]
fn test_validate_invalid_state_machine() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::invalid_state_machine()).unwrap();

    let output = project.run_diwire(&["validate", "workflow.yaml"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("Invalid workflow \"article\" defined by service \"workflow.article\""));
    assert!(output.stderr.contains("A transition in StateMachine can only have one input."));
}

#[test]
fn test_validate_invalid_syntax() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::invalid_syntax()).unwrap();

    let output = project.run_diwire(&["validate", "broken.toml"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("Failed to parse TOML"));
}

#[test]
fn test_validate_missing_file() {
    let project = TestProject::new().unwrap();

    let output = project.run_diwire(&["validate", "absent.toml"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("Cannot find container file"));
}

#[test]
fn test_validate_unused_binding() {
    let project = TestProject::new().unwrap();
    project
        .write(
            "services.toml",
            r#"
[classes."App.Mailer"]
constructor = [{ name = "sender", type = "string" }]

[services.mailer]
class = "App.Mailer"
public = true
arguments = ["me"]
bind = { "$apiKey" = "123" }
"#,
        )
        .unwrap();

    let output = project.run_diwire(&["validate", "services.toml"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("Unused binding \"$apiKey\" in service \"mailer\"."));
}

#[test]
fn test_validate_with_parameter_extension() {
    let project = TestProject::new().unwrap();
    project.write_config("parameter_extensions = [\"framework\"]\n").unwrap();
    project
        .write(
            "services.toml",
            r#"
[services.kernel]
class = "App.Kernel"
public = true
arguments = ["%framework.secret%"]

[framework]
secret = "s3cr3t"
"#,
        )
        .unwrap();

    let output = project.run_diwire(&["validate", "services.toml", "--format", "json"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);

    let without_config = TestProject::new().unwrap();
    without_config
        .write("services.toml", "[framework]\nsecret = \"s3cr3t\"\n")
        .unwrap();
    let output = without_config.run_diwire(&["validate", "services.toml"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("There is no extension able to load the configuration for \"framework\""));
}
