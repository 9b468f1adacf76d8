//! Sample container files.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A container file with its name and format.
#[derive(Clone, Debug)]
pub struct ContainerFixture {
    /// File name, extension included
    pub name: String,
    pub content: String,
}

impl ContainerFixture {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// A mailer wired through a typed binding, a named argument and the logger-aware
    /// tag. Compiles to 3 services, 1 alias and 2 parameters.
    pub fn basic() -> Self {
        Self::new(
            "services.toml",
            r#"
[parameters]
"mailer.sender" = "noreply@example.com"
"mailer.dsn" = "smtp://localhost"

[classes."App.Transport"]
constructor = [{ name = "dsn", type = "string" }]

[classes."App.Mailer"]
interfaces = ["LoggerAwareInterface"]
constructor = [{ name = "transport", type = "App.Transport" }, { name = "sender", type = "string" }]
methods = { setLogger = [{ name = "logger", type = "LoggerInterface" }] }

[classes."App.Logger"]

[services.logger]
class = "App.Logger"

[services."App.Transport"]
arguments = ["%mailer.dsn%"]

[services.mailer]
class = "App.Mailer"
public = true
arguments = { "$sender" = "%mailer.sender%" }
bind = { "App.Transport" = "@App.Transport" }
tags = ["logger.aware"]

[services.unused]
class = "App.Unused"

[aliases]
"app.mailer" = { service = "mailer", public = true }
"#
            .trim_start(),
        )
    }

    /// A dispatcher with one tagged listener and one subscriber.
    pub fn listeners() -> Self {
        Self::new(
            "listeners.yaml",
            r#"
classes:
  App.EventDispatcher: {}
  App.Listener.Welcome:
    methods:
      onUserCreated:
        - { name: event, type: App.Event.UserCreated }
  App.Subscriber.Audit:
    interfaces: [EventSubscriberInterface]
    subscribed_events:
      - { event: user.created, method: audit, priority: 10 }

services:
  event_dispatcher:
    class: App.EventDispatcher
    public: true
  welcome_listener:
    class: App.Listener.Welcome
    tags:
      - { name: kernel.event_listener, event: user.created }
  audit_subscriber:
    class: App.Subscriber.Audit
    tags: [kernel.event_subscriber]
"#
            .trim_start(),
        )
    }

    /// Two services constructed from each other.
    pub fn circular() -> Self {
        Self::new(
            "circular.toml",
            r#"
[services.a]
class = "A"
public = true
arguments = ["@b"]

[services.b]
class = "B"
arguments = ["@a"]
"#
            .trim_start(),
        )
    }

    /// A public service referencing a service that does not exist.
    pub fn missing_reference() -> Self {
        Self::new(
            "missing.toml",
            r#"
[services.mailer]
class = "App.Mailer"
public = true
arguments = ["@transprt"]

[services.transport]
class = "App.Transport"
public = true
"#
            .trim_start(),
        )
    }

    /// A state machine whose transition has two inputs.
    pub fn invalid_state_machine() -> Self {
        Self::new(
            "workflow.yaml",
            r#"
services:
  workflow.article:
    class: Definition
    public: true
    arguments:
      - [draft, review, published]
      - - { name: publish, from: [draft, review], to: published }
      - draft
    tags:
      - workflow.definition: { name: article, type: state_machine, marking_store: single_state }
"#
            .trim_start(),
        )
    }

    pub fn invalid_syntax() -> Self {
        Self::new("broken.toml", "[services.mailer\nclass = \"App.Mailer\"\n")
    }

    /// Write the fixture into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.name);
        fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }
}
