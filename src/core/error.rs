//! Error handling for diwire
//!
//! This module provides the error taxonomy of the service-definition compiler and the
//! user-friendly reporting used by the CLI. The error system follows two principles:
//! 1. **Strongly-typed errors** so passes and tests can match on the exact failure
//! 2. **User-friendly messages** that name the offending service ids and configuration
//!
//! # Architecture
//!
//! - [`DiError`] - Enumerated error types for every compile-time failure
//! - [`ErrorContext`] - Wrapper adding suggestions and details for CLI display
//!
//! Every failure in the pipeline is a configuration-time error and is fatal to the
//! whole compilation. There is no retry or partial-success mode: the operator fixes
//! the configuration source and compiles again.
//!
//! # Error Categories
//!
//! - **References**: [`DiError::ServiceNotFound`], [`DiError::CircularReference`], [`DiError::CircularAlias`]
//! - **Parameters**: [`DiError::ParameterNotFound`], [`DiError::ParameterCircularReference`]
//! - **Bindings**: [`DiError::UnusedBinding`], [`DiError::InvalidBindingValue`]
//! - **Tags**: [`DiError::MissingTagAttribute`], [`DiError::ListenerEventRequired`], [`DiError::NoTaggedServices`]
//! - **Extensions**: [`DiError::ExtensionNotFound`], [`DiError::ExtensionLoadFailed`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use diwire::core::{DiError, user_friendly_error};
//!
//! let error = DiError::MissingTagAttribute {
//!     attribute: "marking_store".to_string(),
//!     tag: "workflow.definition".to_string(),
//!     service_id: "workflow.order".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::workflow::WorkflowError;

/// Library result type for container and compiler operations.
pub type Result<T, E = DiError> = std::result::Result<T, E>;

/// The main error type for diwire operations
///
/// Each variant carries the service id(s) and the configuration piece involved so
/// the rendered message is actionable on its own.
#[derive(Error, Debug)]
pub enum DiError {
    /// A reference points to a service that is neither a definition nor an alias
    #[error("{}", service_not_found_message(.id, .source_id.as_deref(), .alternatives))]
    ServiceNotFound {
        /// The missing service id
        id: String,
        /// The service holding the reference, when known
        source_id: Option<String>,
        /// Similar existing ids
        alternatives: Vec<String>,
    },

    /// A `%placeholder%` names an unknown parameter
    #[error("{}", parameter_not_found_message(.key, .source_id.as_deref(), .alternatives))]
    ParameterNotFound {
        /// The missing parameter name
        key: String,
        /// The service whose configuration used the placeholder, when known
        source_id: Option<String>,
        /// Similar existing parameter names
        alternatives: Vec<String>,
    },

    /// Parameters reference each other in a loop
    #[error("Circular reference detected for parameter \"{key}\" ({}).", quoted_path(.path, " > "))]
    ParameterCircularReference {
        /// The parameter where the loop was detected
        key: String,
        /// The resolution chain, ending with the repeated parameter
        path: Vec<String>,
    },

    /// A non-scalar parameter was embedded inside a larger string
    #[error(
        "A string value must be composed of strings and/or numbers, but found parameter \"{key}\" of type {value_type} inside string value \"{template}\"."
    )]
    InvalidParameterValue {
        /// The embedded parameter
        key: String,
        /// Type name of the parameter value
        value_type: String,
        /// The string being resolved
        template: String,
    },

    /// Aliases point at each other in a loop
    #[error("Circular reference detected for alias \"{alias}\" ({}).", quoted_path(.path, " -> "))]
    CircularAlias {
        /// The alias where resolution started
        alias: String,
        /// The alias chain
        path: Vec<String>,
    },

    /// Services depend on each other at construction time in a loop
    #[error("Circular reference detected for service \"{service_id}\", path: \"{}\".", .path.join(" -> "))]
    CircularReference {
        /// The first service of the cycle
        service_id: String,
        /// The cycle, ending with the repeated service
        path: Vec<String>,
    },

    /// A tag is missing an attribute its consumer requires
    #[error("The \"{attribute}\" for the tag \"{tag}\" of service \"{service_id}\" must be set.")]
    MissingTagAttribute {
        /// The missing attribute
        attribute: String,
        /// The tag name
        tag: String,
        /// The tagged service
        service_id: String,
    },

    /// A tag attribute has a value its consumer cannot use
    #[error("Invalid \"{attribute}\" attribute on tag \"{tag}\" of service \"{service_id}\": {reason}")]
    InvalidTagAttribute {
        /// The attribute name
        attribute: String,
        /// The tag name
        tag: String,
        /// The tagged service
        service_id: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A service-level binding never matched any parameter
    #[error("{}", unused_binding_message(.key, .service_id, .hints))]
    UnusedBinding {
        /// The binding key (`$name` or a type)
        key: String,
        /// The service that declared the binding
        service_id: String,
        /// Earlier failures that may explain why the binding was not used
        hints: Vec<String>,
    },

    /// A typed binding carries a value that cannot be injected by type
    #[error(
        "Invalid value for binding key \"{key}\" for service \"{service_id}\": expected null, a reference or an inline definition, {value_type} given."
    )]
    InvalidBindingValue {
        /// The binding key
        key: String,
        /// The service that declared the binding
        service_id: String,
        /// Type name of the offending value
        value_type: String,
    },

    /// A binding key is neither `$name` nor a type
    #[error("Invalid binding key \"{key}\" for service \"{service_id}\": {reason}")]
    InvalidBindingKey {
        /// The binding key
        key: String,
        /// The service that declared the binding
        service_id: String,
        /// Why the key was rejected
        reason: String,
    },

    /// A listener tag without `event` whose event could not be inferred
    #[error("Service \"{service_id}\" must define the \"event\" attribute on \"{tag}\" tags.")]
    ListenerEventRequired {
        /// The listener service
        service_id: String,
        /// The listener tag name
        tag: String,
    },

    /// A class used by a service has no metadata in the class registry
    #[error("Class \"{class}\" used for service \"{service_id}\" cannot be found.")]
    ClassNotFound {
        /// The class name
        class: String,
        /// The service using it
        service_id: String,
    },

    /// A tagged service does not implement the interface its tag requires
    #[error("Service \"{service_id}\" must implement interface \"{interface}\".")]
    InterfaceNotImplemented {
        /// The service
        service_id: String,
        /// The required interface
        interface: String,
    },

    /// An aggregate service is registered but no participant is tagged for it
    #[error("You must tag at least one service as \"{tag}\" to use the \"{service}\" service.")]
    NoTaggedServices {
        /// The participant tag
        tag: String,
        /// The aggregate service
        service: String,
    },

    /// An abstract definition carries a tag that requires instantiation
    #[error("The service \"{service_id}\" tagged \"{tag}\" must not be abstract.")]
    AbstractTaggedService {
        /// The abstract service
        service_id: String,
        /// The tag name
        tag: String,
    },

    /// A definition is inconsistent with its class schema
    #[error("Invalid service \"{service_id}\": {reason}")]
    InvalidService {
        /// The service
        service_id: String,
        /// What is wrong
        reason: String,
    },

    /// Constructor or method-call arguments cannot be dumped as they are
    #[error("Invalid arguments for service \"{service_id}\": {reason}")]
    InvalidArguments {
        /// The service
        service_id: String,
        /// What is wrong
        reason: String,
    },

    /// A workflow definition failed validation
    #[error("Invalid workflow \"{workflow}\" defined by service \"{service_id}\": {source}")]
    InvalidWorkflow {
        /// The workflow name from the tag
        workflow: String,
        /// The service holding the definition
        service_id: String,
        /// The validator failure
        #[source]
        source: WorkflowError,
    },

    /// Configuration was given for a namespace no extension handles
    #[error("{}", extension_not_found_message(.namespace, .available))]
    ExtensionNotFound {
        /// The configuration namespace
        namespace: String,
        /// Registered extension aliases
        available: Vec<String>,
    },

    /// An extension's load step failed; the whole merge is aborted
    #[error("Extension \"{extension}\" failed to load its configuration: {source}")]
    ExtensionLoadFailed {
        /// The extension alias
        extension: String,
        /// The underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// An extension tried to register another extension while loading
    #[error(
        "You cannot register extension \"{extension}\" from \"{loading}\". Extensions must be registered before the container is compiled."
    )]
    ExtensionRegistrationForbidden {
        /// The extension being registered
        extension: String,
        /// The extension currently loading
        loading: String,
    },

    /// A configuration change was attempted after compilation
    #[error("Cannot {operation} on a compiled container.")]
    ContainerFrozen {
        /// The attempted operation
        operation: String,
    },

    /// `compile` was called twice
    #[error("The container has already been compiled.")]
    AlreadyCompiled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of a dump failed
    #[error("Failed to serialize container as {format}: {reason}")]
    Serialization {
        /// The output format
        format: String,
        /// The serializer's message
        reason: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

fn quoted_path(path: &[String], separator: &str) -> String {
    path.iter().map(|p| format!("\"{p}\"")).collect::<Vec<_>>().join(separator)
}

fn alternatives_suffix(alternatives: &[String]) -> String {
    match alternatives {
        [] => String::new(),
        [single] => format!(" Did you mean this: \"{single}\"?"),
        many => format!(" Did you mean one of these: {}?", quoted_path(many, ", ")),
    }
}

fn service_not_found_message(id: &str, source_id: Option<&str>, alternatives: &[String]) -> String {
    let head = match source_id {
        Some(source) => {
            format!("The service \"{source}\" has a dependency on a non-existent service \"{id}\".")
        }
        None => format!("You have requested a non-existent service \"{id}\"."),
    };
    format!("{head}{}", alternatives_suffix(alternatives))
}

fn parameter_not_found_message(key: &str, source_id: Option<&str>, alternatives: &[String]) -> String {
    let head = match source_id {
        Some(source) => format!(
            "The service \"{source}\" has a dependency on a non-existent parameter \"{key}\"."
        ),
        None => format!("You have requested a non-existent parameter \"{key}\"."),
    };
    format!("{head}{}", alternatives_suffix(alternatives))
}

fn unused_binding_message(key: &str, service_id: &str, hints: &[String]) -> String {
    let mut message = format!("Unused binding \"{key}\" in service \"{service_id}\".");
    if !hints.is_empty() {
        message.push_str(&format!(
            "\nCould be related to{}:",
            if hints.len() > 1 { " one of" } else { "" }
        ));
        for hint in hints {
            message.push_str(&format!("\n - {hint}"));
        }
    }
    message
}

fn extension_not_found_message(namespace: &str, available: &[String]) -> String {
    let found = if available.is_empty() {
        "none".to_string()
    } else {
        quoted_path(available, ", ")
    };
    format!(
        "There is no extension able to load the configuration for \"{namespace}\". Looked for namespace \"{namespace}\", found {found}."
    )
}

impl DiError {
    /// Wrap an arbitrary failure coming out of an extension.
    pub fn extension_load_failed(extension: impl Into<String>, source: anyhow::Error) -> Self {
        Self::ExtensionLoadFailed {
            extension: extension.into(),
            source: source.into(),
        }
    }

    /// The service id the error is about, when it has one.
    #[must_use]
    pub fn service_id(&self) -> Option<&str> {
        match self {
            Self::ServiceNotFound { source_id, .. } | Self::ParameterNotFound { source_id, .. } => {
                source_id.as_deref()
            }
            Self::CircularReference { service_id, .. }
            | Self::MissingTagAttribute { service_id, .. }
            | Self::InvalidTagAttribute { service_id, .. }
            | Self::UnusedBinding { service_id, .. }
            | Self::InvalidBindingValue { service_id, .. }
            | Self::InvalidBindingKey { service_id, .. }
            | Self::ListenerEventRequired { service_id, .. }
            | Self::ClassNotFound { service_id, .. }
            | Self::InterfaceNotImplemented { service_id, .. }
            | Self::AbstractTaggedService { service_id, .. }
            | Self::InvalidService { service_id, .. }
            | Self::InvalidArguments { service_id, .. }
            | Self::InvalidWorkflow { service_id, .. } => Some(service_id),
            _ => None,
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Wraps an error message with an optional suggestion and details. The CLI renders
/// it with colors; `Display` renders it as plain text for logs.
#[derive(Debug)]
pub struct ErrorContext {
    /// The rendered error message
    pub error: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from anything displayable
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            error: error.to_string(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] carrying suggestions for the CLI.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(di_error) = error.downcast_ref::<DiError>() {
        return create_error_context(di_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(with_chain(&error))
                    .with_suggestion("Check that the container file exists and the path is correct");
            }
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(with_chain(&error))
                    .with_suggestion("Check the file permissions of the container file");
            }
            _ => {}
        }
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(with_chain(&error))
            .with_suggestion("Check the TOML syntax: quotes around dotted keys, brackets and table headers")
            .with_details("Service ids and parameter names containing dots must be quoted in TOML keys");
    }

    if error.downcast_ref::<serde_yaml::Error>().is_some() {
        return ErrorContext::new(with_chain(&error))
            .with_suggestion("Check the YAML syntax: indentation and quoting of '@' and '%' values");
    }

    ErrorContext::new(with_chain(&error))
}

/// Render an error followed by its cause chain.
fn with_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    message
}

fn create_error_context(error: &DiError) -> ErrorContext {
    let ctx = ErrorContext::new(error);
    match error {
        DiError::ServiceNotFound { alternatives, .. } if alternatives.is_empty() => ctx
            .with_suggestion("Define the missing service, or reference it with '@?' to make it optional")
            .with_details("References must resolve to a definition or an alias once the container is compiled"),
        DiError::ServiceNotFound { .. } => {
            ctx.with_suggestion("Check the spelling of the referenced service id")
        }
        DiError::ParameterNotFound { .. } => ctx
            .with_suggestion("Declare the parameter in [parameters] or escape a literal percent sign as '%%'"),
        DiError::ParameterCircularReference { .. } => {
            ctx.with_suggestion("Break the loop by giving one of the parameters a literal value")
        }
        DiError::CircularReference { .. } => ctx
            .with_suggestion("Move one of the dependencies to a method call, or wrap it in a '!closure' to defer it")
            .with_details("Only constructor arguments and factories take part in circular reference detection"),
        DiError::MissingTagAttribute { attribute, tag, .. } => ctx.with_suggestion(format!(
            "Add a \"{attribute}\" attribute to the \"{tag}\" tag"
        )),
        DiError::UnusedBinding { key, .. } => ctx
            .with_suggestion(format!(
                "Remove the \"{key}\" binding or add a constructor/method parameter it can satisfy"
            ))
            .with_details("Bindings match parameters by \"$name\" first, then by non-builtin type hint. Parameters need to be declared in [classes]"),
        DiError::InvalidBindingValue { .. } => ctx.with_suggestion(
            "Typed bindings can only inject references or inline definitions; use a \"$name\" key for scalar values",
        ),
        DiError::ListenerEventRequired { .. } => ctx
            .with_suggestion("Add an \"event\" attribute, or declare the listener method's first parameter with a concrete event class in [classes]"),
        DiError::ClassNotFound { class, .. } => ctx.with_suggestion(format!(
            "Declare \"{class}\" in the [classes] section so its schema is known"
        )),
        DiError::InterfaceNotImplemented { interface, .. } => ctx.with_suggestion(format!(
            "Add \"{interface}\" to the interfaces of the service class"
        )),
        DiError::NoTaggedServices { tag, .. } => {
            ctx.with_suggestion(format!("Tag at least one service with \"{tag}\""))
        }
        DiError::InvalidWorkflow { .. } => ctx
            .with_details("Workflow places and transitions are read from the arguments of the tagged service: places, transitions, initial places"),
        DiError::ExtensionNotFound { .. } => ctx.with_suggestion(
            "Register the extension before loading configuration files, or remove the section",
        ),
        DiError::ExtensionLoadFailed { .. } => ctx
            .with_details("Definitions merged from extensions that loaded before the failing one are kept"),
        DiError::ContainerFrozen { .. } | DiError::AlreadyCompiled => ctx
            .with_suggestion("Build a new container builder instead of modifying a compiled one"),
        _ => ctx,
    }
}
