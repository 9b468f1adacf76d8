use diwire::test_utils::ContainerFixture;

use crate::common::TestProject;

#[test]
fn test_list_declared_services() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::basic()).unwrap();

    let output = project.run_diwire(&["list", "services.toml"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Services:"));
    assert!(output.stdout.contains("mailer App.Mailer (public)"));
    assert!(output.stdout.contains("tags: logger.aware"));
    // Not compiled: the unused private service is still there
    assert!(output.stdout.contains("unused App.Unused"));
    assert!(output.stdout.contains("app.mailer -> mailer (public)"));
}

#[test]
fn test_list_compiled_services() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::basic()).unwrap();

    let output = project.run_diwire(&["list", "services.toml", "--compiled"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("mailer App.Mailer"));
    assert!(!output.stdout.contains("unused"));
}

#[test]
fn test_list_by_tag() {
    let project = TestProject::new().unwrap();
    project.write_fixture(&ContainerFixture::listeners()).unwrap();

    let output = project.run_diwire(&["list", "listeners.yaml", "--tag", "kernel.event_listener"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Services tagged \"kernel.event_listener\":"));
    assert!(output.stdout.contains("welcome_listener App.Listener.Welcome"));
    assert!(output.stdout.contains("event=user.created"));
    assert!(!output.stdout.contains("audit_subscriber"));

    let output = project.run_diwire(&["list", "listeners.yaml", "--tag", "nothing"]).unwrap();
    assert!(output.success);
    assert!(output.stdout.contains("No services tagged \"nothing\""));
}
