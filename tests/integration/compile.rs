use diwire::test_utils::ContainerFixture;
use predicates::prelude::*;

use crate::common::TestProject;

fn compile_json(project: &TestProject, file: &str) -> serde_json::Value {
    let output = project.run_diwire(&["compile", file]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    serde_json::from_str(&output.stdout).unwrap()
}

#[test]
fn test_compile_resolves_and_removes() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::basic()).unwrap();

    let dump = compile_json(&project, "services.toml");
    assert_eq!(dump["compiled"], true);

    let services = dump["services"].as_object().unwrap();
    let mut ids: Vec<&str> = services.keys().map(String::as_str).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["App.Transport", "logger", "mailer"]);

    let mailer = &services["mailer"];
    assert_eq!(mailer["arguments"], serde_json::json!(["@App.Transport", "noreply@example.com"]));
    assert_eq!(mailer["calls"][0]["method"], "setLogger");
    assert_eq!(mailer["calls"][0]["arguments"], serde_json::json!(["@logger"]));
    assert_eq!(services["App.Transport"]["arguments"], serde_json::json!(["smtp://localhost"]));

    assert_eq!(dump["aliases"]["app.mailer"]["target"], "mailer");
    assert!(dump.get("compiler_log").is_none());
}

#[test]
fn test_compile_registers_listeners() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::listeners()).unwrap();

    let dump = compile_json(&project, "listeners.yaml");
    let calls = dump["services"]["event_dispatcher"]["calls"].as_array().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call["method"] == "addListener"));
    assert!(calls.iter().all(|call| call["arguments"][0] == "user.created"));

    // Listeners are only referenced lazily, yet they survive removal
    assert!(dump["services"].get("welcome_listener").is_some());
    assert!(dump["services"].get("audit_subscriber").is_some());
}

#[test]
fn test_compile_frozen_events_from_config() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::listeners()).unwrap();
    project
        .write_config("[event_dispatcher]\nfrozen_events = [\"user.created\"]\n")
        .unwrap();

    let dump = compile_json(&project, "listeners.yaml");
    let provider_id = "event_dispatcher.listener_provider.user.created";
    let provider = &dump["services"][provider_id];
    assert_eq!(provider["class"], "ListenerProvider");
    // The subscriber has the higher priority
    assert_eq!(provider["arguments"][0][0][0]["!closure"], "@audit_subscriber");
    assert_eq!(provider["arguments"][0][1][0]["!closure"], "@welcome_listener");

    let calls = dump["services"]["event_dispatcher"]["calls"].as_array().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["method"], "setListenerProvider");
    assert_eq!(calls[0]["arguments"][1], format!("@{provider_id}"));
}

#[test]
fn test_compile_yaml_to_file() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::basic()).unwrap();

    let output = project
        .run_diwire(&["compile", "services.toml", "--format", "yaml", "--output", "build/container.yaml", "--with-log"])
        .unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.is_empty());
    assert!(output.stderr.contains("Compiled 3 services"));

    let written = std::fs::read_to_string(project.path().join("build/container.yaml")).unwrap();
    let dump: serde_yaml::Value = serde_yaml::from_str(&written).unwrap();
    assert_eq!(dump["compiled"], serde_yaml::Value::Bool(true));
    assert!(dump["compiler_log"].as_sequence().is_some_and(|log| !log.is_empty()));
}

#[test]
fn test_compile_debug_dump_from_config() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::basic()).unwrap();
    let dump_path = project.path().join("var/debug.json");
    project
        .write_config(&format!("debug_dump = {:?}\n", dump_path.display().to_string()))
        .unwrap();

    let output = project.run_diwire(&["compile", "services.toml"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);

    let debug: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&dump_path).unwrap()).unwrap();
    assert!(debug["services"]["mailer"].is_object());
}

#[test]
fn test_compile_failure_exit_code() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::circular()).unwrap();

    assert_cmd::Command::cargo_bin("diwire")
        .unwrap()
        .current_dir(project.path())
        .env("DIWIRE_CONFIG_PATH", project.config_path())
        .env_remove("DIWIRE_DEBUG_DUMP")
        .args(["compile", "circular.toml"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Circular reference detected"));
}
