//! Wires tagged event listeners and subscribers into the event dispatcher.

use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::CompilerPass;
use crate::config::EventDispatcherConfig;
use crate::constants::{INVOKE_METHOD, LISTENER_PROVIDER_CLASS};
use crate::container::{ClassRegistry, ContainerBuilder};
use crate::core::{DiError, Result};
use crate::definition::{Definition, ListenerTag, Value};
use crate::utils::camelize;

/// One listener ready to be registered.
#[derive(Debug, Clone, PartialEq)]
struct Listener {
    service_id: String,
    event: String,
    method: String,
    priority: i64,
    dispatcher: String,
}

impl Listener {
    /// `[closure(@service), method]`
    fn callable(&self) -> Value {
        Value::List(vec![
            Value::closure(self.service_id.clone()),
            Value::String(self.method.clone()),
        ])
    }
}

/// Registers `kernel.event_listener` and `kernel.event_subscriber` services on the
/// dispatcher.
///
/// Listeners of frozen events are not registered one by one. They are collected into a
/// dedicated `<dispatcher>.listener_provider.<event>` service, highest priority first,
/// and the dispatcher receives that provider instead.
#[derive(Debug, Clone)]
pub struct RegisterListenersPass {
    config: EventDispatcherConfig,
}

impl RegisterListenersPass {
    pub fn new(config: EventDispatcherConfig) -> Self {
        Self { config }
    }

    fn event_aliases(&self, container: &ContainerBuilder) -> Result<IndexMap<String, String>> {
        let name = &self.config.aliases_parameter;
        if !container.parameters().has(name) {
            return Ok(IndexMap::new());
        }

        let raw = container.parameters().get(name)?.clone();
        match container.parameters().resolve_value(&raw)? {
            Value::Map(entries) => Ok(entries
                .into_iter()
                .filter_map(|(alias, target)| target.to_interpolated().map(|t| (alias, t)))
                .collect()),
            other => {
                warn!(
                    "Parameter \"{}\" should be a map of event aliases, {} given",
                    name,
                    other.type_name()
                );
                Ok(IndexMap::new())
            }
        }
    }

    /// The event named by the type of the first parameter of `method`.
    fn event_from_signature(
        &self,
        container: &ContainerBuilder,
        service_id: &str,
        definition: &Definition,
        method: &str,
    ) -> Result<String> {
        let required = || DiError::ListenerEventRequired {
            service_id: service_id.to_string(),
            tag: self.config.listener_tag.clone(),
        };

        let metadata = match &definition.class {
            Some(class) => container.reflection_class(class)?,
            None => None,
        };
        let Some(metadata) = metadata else {
            return Err(required());
        };

        let type_name = container
            .classes()
            .method(&metadata.name, method)
            .and_then(|signature| signature.first())
            .and_then(|parameter| parameter.type_hint.as_deref())
            .map(|hint| hint.trim_start_matches('?'))
            .ok_or_else(required)?;

        if ClassRegistry::is_builtin_type(type_name)
            || self.config.generic_event_types.iter().any(|t| t == type_name)
        {
            return Err(required());
        }
        Ok(type_name.to_string())
    }

    /// `on` + the camel-cased event, or `__invoke` when only that exists.
    fn default_method(container: &ContainerBuilder, definition: &Definition, event: &str) -> Result<String> {
        let method = format!("on{}", camelize(event));

        let metadata = match &definition.class {
            Some(class) => container.reflection_class(class)?,
            None => None,
        };
        if let Some(metadata) = metadata {
            let classes = container.classes();
            if !classes.has_method(&metadata.name, &method) && classes.has_method(&metadata.name, INVOKE_METHOD) {
                return Ok(INVOKE_METHOD.to_string());
            }
        }
        Ok(method)
    }

    fn collect_listeners(
        &self,
        container: &ContainerBuilder,
        aliases: &IndexMap<String, String>,
    ) -> Result<Vec<Listener>> {
        let tag = &self.config.listener_tag;
        let subscribers: HashSet<String> = container
            .find_tagged_service_ids(&self.config.subscriber_tag, false)?
            .into_keys()
            .collect();

        let mut listeners = Vec::new();
        for (service_id, occurrences) in container.find_tagged_service_ids(tag, true)? {
            let definition = container.find_definition(&service_id)?;

            for attributes in &occurrences {
                let listener_tag = ListenerTag::from_attributes(attributes, tag, &service_id)?;

                let mut method = listener_tag.method;
                let event = match listener_tag.event {
                    Some(event) => event,
                    None if subscribers.contains(&service_id) => continue,
                    None => {
                        let invoked = method.get_or_insert_with(|| INVOKE_METHOD.to_string());
                        self.event_from_signature(container, &service_id, definition, invoked)?
                    }
                };
                let event = aliases.get(&event).cloned().unwrap_or(event);

                let method = match method {
                    Some(method) => method,
                    None => Self::default_method(container, definition, &event)?,
                };

                listeners.push(Listener {
                    service_id: service_id.clone(),
                    event,
                    method,
                    priority: listener_tag.priority,
                    dispatcher: listener_tag
                        .dispatcher
                        .unwrap_or_else(|| self.config.service.clone()),
                });
            }
        }
        Ok(listeners)
    }

    fn collect_subscribers(
        &self,
        container: &ContainerBuilder,
        aliases: &IndexMap<String, String>,
    ) -> Result<Vec<Listener>> {
        let interface = crate::constants::EVENT_SUBSCRIBER_INTERFACE;
        let mut listeners = Vec::new();

        for (service_id, _) in container.find_tagged_service_ids(&self.config.subscriber_tag, true)? {
            let definition = container.find_definition(&service_id)?;
            let class = definition.class.clone().unwrap_or_default();
            let metadata = container
                .reflection_class(&class)?
                .ok_or_else(|| DiError::ClassNotFound {
                    class: class.clone(),
                    service_id: service_id.clone(),
                })?;

            if !container.classes().implements(&metadata.name, interface) {
                return Err(DiError::InterfaceNotImplemented {
                    service_id: service_id.clone(),
                    interface: interface.to_string(),
                });
            }

            for subscribed in &metadata.subscribed_events {
                listeners.push(Listener {
                    service_id: service_id.clone(),
                    event: aliases.get(&subscribed.event).cloned().unwrap_or_else(|| subscribed.event.clone()),
                    method: subscribed.method.clone(),
                    priority: subscribed.priority,
                    dispatcher: self.config.service.clone(),
                });
            }
        }
        Ok(listeners)
    }

    fn dispatcher_mut<'c>(container: &'c mut ContainerBuilder, dispatcher: &str) -> Result<&'c mut Definition> {
        let target = container.resolve_alias_target(dispatcher)?;
        if !container.has_definition(&target) {
            return Err(container.service_not_found(dispatcher, None));
        }
        container
            .definition_mut(&target)
            .ok_or_else(|| DiError::Other {
                message: format!("dispatcher \"{dispatcher}\" vanished"),
            })
    }
}

impl CompilerPass for RegisterListenersPass {
    fn name(&self) -> &'static str {
        "RegisterListenersPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        if !container.has(&self.config.service) {
            debug!("No \"{}\" service, skipping listener registration", self.config.service);
            return Ok(());
        }

        let aliases = self.event_aliases(container)?;
        let mut listeners = self.collect_listeners(container, &aliases)?;
        listeners.extend(self.collect_subscribers(container, &aliases)?);

        let mut frozen: IndexMap<(String, String), Vec<Listener>> = IndexMap::new();
        let mut registered = 0;

        for listener in listeners {
            if self.config.frozen_events.contains(&listener.event) {
                frozen
                    .entry((listener.dispatcher.clone(), listener.event.clone()))
                    .or_default()
                    .push(listener);
                continue;
            }

            let dispatcher = Self::dispatcher_mut(container, &listener.dispatcher)?;
            dispatcher.add_method_call(
                "addListener",
                vec![
                    Value::String(listener.event.clone()),
                    listener.callable(),
                    Value::Int(listener.priority),
                ],
            );
            registered += 1;
        }

        for ((dispatcher, event), mut event_listeners) in frozen {
            event_listeners.sort_by(|a, b| b.priority.cmp(&a.priority));

            let provider_id = format!("{dispatcher}.listener_provider.{event}");
            let callables = event_listeners.iter().map(Listener::callable).collect();
            container.set_definition(
                provider_id.clone(),
                Definition::new(LISTENER_PROVIDER_CLASS).with_argument(Value::List(callables)),
            );

            Self::dispatcher_mut(container, &dispatcher)?.add_method_call(
                "setListenerProvider",
                vec![Value::String(event.clone()), Value::reference(provider_id.clone())],
            );
            debug!("Froze {} listeners of \"{}\" into \"{}\"", event_listeners.len(), event, provider_id);
            registered += event_listeners.len();
        }

        container.log(self.name(), format!("registered {registered} listeners"));
        Ok(())
    }
}
