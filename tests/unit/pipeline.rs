//! Behaviour of the default pipeline as a whole.

use diwire::compiler::Compiler;
use diwire::container::{ClassMetadata, ContainerBuilder, Parameter};
use diwire::core::{DiError, Result};
use diwire::definition::tag::attributes;
use diwire::definition::{Definition, Reference, Value};
use diwire::test_utils::{init_test_logging, register_class};

fn compile(container: &mut ContainerBuilder) -> Result<()> {
    init_test_logging(None);
    Compiler::new().compile(container)
}

#[test]
fn test_named_binding_fills_constructor_argument() -> Result<()> {
    let mut container = ContainerBuilder::new();
    register_class(&mut container, "App.Client", &[("apiKey", "string")]);
    container.set_definition(
        "client",
        Definition::new("App.Client").with_binding("$apiKey", Value::from("123")).with_public(true),
    );

    compile(&mut container)?;

    let client = container.find_definition("client")?;
    assert_eq!(client.arguments.get_index(0), Some(&Value::from("123")));
    assert!(client.bindings["$apiKey"].is_used());
    Ok(())
}

#[test]
fn test_unused_binding_fails() {
    let mut container = ContainerBuilder::new();
    register_class(&mut container, "App.Client", &[("token", "")]);
    container.set_definition(
        "client",
        Definition::new("App.Client").with_binding("$apiKey", Value::from("123")).with_public(true),
    );

    let err = compile(&mut container).unwrap_err();
    assert!(matches!(err, DiError::UnusedBinding { ref key, ref service_id, .. } if key == "$apiKey" && service_id == "client"));
}

#[test]
fn test_collector_order_is_stable_by_priority() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.set_definition("serializer", Definition::new("Serializer").with_public(true));
    for (id, priority) in [("a", 0i64), ("b", 5), ("c", 5)] {
        container.set_definition(
            id,
            Definition::new("Normalizer")
                .with_tag_attributes("serializer.normalizer", attributes([("priority", priority)])),
        );
    }
    container.set_definition(
        "high",
        Definition::new("Encoder").with_tag_attributes("serializer.encoder", attributes([("priority", 10i64)])),
    );
    container.set_definition(
        "low",
        Definition::new("Encoder").with_tag_attributes("serializer.encoder", attributes([("priority", -5i64)])),
    );

    compile(&mut container)?;

    let serializer = container.find_definition("serializer")?;
    assert_eq!(
        serializer.arguments.get_index(0),
        Some(&Value::List(vec![Value::reference("b"), Value::reference("c"), Value::reference("a")]))
    );
    assert_eq!(
        serializer.arguments.get_index(1),
        Some(&Value::List(vec![Value::reference("high"), Value::reference("low")]))
    );
    // Referenced from a public service, so none of them is removed
    assert!(container.has_definition("a") && container.has_definition("low"));
    Ok(())
}

#[test]
fn test_named_arguments_resolve_to_positions() -> Result<()> {
    let mut container = ContainerBuilder::new();
    register_class(&mut container, "App.Mailer", &[("transport", ""), ("sender", "string")]);
    container.set_definition(
        "mailer",
        Definition::new("App.Mailer")
            .with_named_argument("$sender", Value::from("me"))
            .with_named_argument("$transport", Value::from("smtp"))
            .with_public(true),
    );

    compile(&mut container)?;

    let args: Vec<String> = container
        .find_definition("mailer")?
        .arguments
        .iter()
        .map(|(key, value)| format!("{key}={}", value.as_str().unwrap_or_default()))
        .collect();
    assert_eq!(args, vec!["0=smtp", "1=me"]);
    Ok(())
}

#[test]
fn test_unknown_named_argument_fails() {
    let mut container = ContainerBuilder::new();
    register_class(&mut container, "App.Mailer", &[("sender", "string")]);
    container.set_definition(
        "mailer",
        Definition::new("App.Mailer").with_named_argument("$senderr", Value::from("me")).with_public(true),
    );

    let err = compile(&mut container).unwrap_err();
    assert_eq!(err.service_id(), Some("mailer"));
}

#[test]
fn test_invalid_reference_behaviours() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.set_definition(
        "mailer",
        Definition::new("App.Mailer")
            .with_argument(Value::Reference(Reference::null_on_invalid("logger")))
            .with_call("setCache", vec![Value::Reference(Reference::ignore_on_invalid("cache"))])
            .with_call("setSender", vec![Value::from("me")])
            .with_public(true),
    );

    compile(&mut container)?;

    let mailer = container.find_definition("mailer")?;
    assert_eq!(mailer.arguments.get_index(0), Some(&Value::Null));
    assert!(!mailer.has_method_call("setCache"));
    assert!(mailer.has_method_call("setSender"));
    Ok(())
}

#[test]
fn test_missing_reference_lists_alternatives() {
    let mut container = ContainerBuilder::new();
    container.set_definition(
        "mailer",
        Definition::new("App.Mailer").with_argument(Value::reference("loger")).with_public(true),
    );
    container.set_definition("logger", Definition::new("App.Logger").with_public(true));

    match compile(&mut container).unwrap_err() {
        DiError::ServiceNotFound { id, source_id, alternatives } => {
            assert_eq!(id, "loger");
            assert_eq!(source_id.as_deref(), Some("mailer"));
            assert_eq!(alternatives, vec!["logger".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_reference_in_removed_service_is_ignored() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.set_definition("orphan", Definition::new("App.Orphan").with_argument(Value::reference("missing")));

    compile(&mut container)?;
    assert!(!container.has_definition("orphan"));
    Ok(())
}

#[test]
fn test_constructor_cycle_fails_but_closure_cycle_does_not() -> Result<()> {
    let mut cyclic = ContainerBuilder::new();
    cyclic.set_definition("a", Definition::new("A").with_argument(Value::reference("b")).with_public(true));
    cyclic.set_definition("b", Definition::new("B").with_argument(Value::reference("a")));
    assert!(matches!(
        compile(&mut cyclic).unwrap_err(),
        DiError::CircularReference { ref path, .. } if path == &["a", "b", "a"]
    ));

    let mut lazy = ContainerBuilder::new();
    lazy.set_definition("a", Definition::new("A").with_argument(Value::reference("b")).with_public(true));
    lazy.set_definition("b", Definition::new("B").with_argument(Value::closure("a")));
    compile(&mut lazy)?;
    assert!(lazy.has_definition("b"));
    Ok(())
}

#[test]
fn test_unused_private_definitions_are_removed() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.set_definition("app", Definition::new("App").with_argument(Value::reference("dep")).with_public(true));
    container.set_definition("dep", Definition::new("Dep").with_property("inner", Value::reference("leaf")));
    container.set_definition("leaf", Definition::new("Leaf"));
    container.set_definition("unused", Definition::new("Unused"));
    container.set_definition("base", Definition::new("Base").with_abstract(true).with_public(true));
    container.set_definition("kernel", Definition::new("Kernel").with_synthetic(true));

    compile(&mut container)?;

    assert_eq!(container.definition_ids(), vec!["app", "dep", "leaf", "kernel"]);
    Ok(())
}

#[test]
fn test_logger_injected_into_aware_services() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.classes_mut().register(
        ClassMetadata::new("App.Mailer")
            .with_interface("LoggerAwareInterface")
            .with_method("setLogger", vec![Parameter::typed("logger", "LoggerInterface")]),
    );
    container.set_definition("logger", Definition::new("App.Logger"));
    container.set_definition("mailer", Definition::new("App.Mailer").with_tag("logger.aware").with_public(true));

    compile(&mut container)?;

    let mailer = container.find_definition("mailer")?;
    assert_eq!(mailer.calls[0].method, "setLogger");
    assert_eq!(mailer.calls[0].arguments.get_index(0), Some(&Value::reference("logger")));
    assert!(container.has_definition("logger"));
    Ok(())
}

#[test]
fn test_workflow_missing_marking_store_names_service() {
    let mut container = ContainerBuilder::new();
    container.set_definition(
        "workflow.order",
        Definition::new("Definition")
            .with_argument(Value::List(vec![Value::from("new")]))
            .with_tag_attributes("workflow.definition", attributes([("name", "order"), ("type", "workflow")])),
    );

    let message = compile(&mut container).unwrap_err().to_string();
    assert!(message.contains("marking_store"));
    assert!(message.contains("workflow.order"));
}

#[test]
fn test_parameters_resolved_and_frozen() -> Result<()> {
    let mut container = ContainerBuilder::new();
    container.set_parameter("root", Value::from("/srv"))?;
    container.set_parameter("cache_dir", Value::from("%root%/cache"))?;
    container.set_definition(
        "cache",
        Definition::new("App.Cache").with_argument(Value::from("%cache_dir%")).with_public(true),
    );

    compile(&mut container)?;

    assert_eq!(container.parameter("cache_dir")?, &Value::from("/srv/cache"));
    assert_eq!(
        container.find_definition("cache")?.arguments.get_index(0),
        Some(&Value::from("/srv/cache"))
    );
    assert!(container.set_parameter("late", Value::Null).is_err());
    assert!(matches!(compile(&mut container), Err(DiError::AlreadyCompiled)));
    Ok(())
}
