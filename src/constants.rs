//! Well-known service ids, tag names and interface names.
//!
//! The collector passes default to these names. Most of them can be overridden
//! through [`crate::config::CompilerConfig`].

/// Aggregate serializer service.
pub const SERIALIZER_SERVICE: &str = "serializer";

/// Tag for serializer normalizers, injected as argument 0.
pub const SERIALIZER_NORMALIZER_TAG: &str = "serializer.normalizer";

/// Tag for serializer encoders, injected as argument 1.
pub const SERIALIZER_ENCODER_TAG: &str = "serializer.encoder";

/// Aggregate property-info extractor service.
pub const PROPERTY_INFO_SERVICE: &str = "property_info";

/// Property-info extractor tags, in argument order.
pub const PROPERTY_INFO_TAGS: [&str; 5] = [
    "property_info.list_extractor",
    "property_info.type_extractor",
    "property_info.description_extractor",
    "property_info.access_extractor",
    "property_info.initializable_extractor",
];

/// Logger service injected into logger-aware services.
pub const LOGGER_SERVICE: &str = "logger";

/// Tag marking services that want a logger.
pub const LOGGER_AWARE_TAG: &str = "logger.aware";

/// Interface a logger-aware class must implement.
pub const LOGGER_AWARE_INTERFACE: &str = "LoggerAwareInterface";

/// Method used to inject the logger.
pub const SET_LOGGER_METHOD: &str = "setLogger";

/// Default event dispatcher service.
pub const EVENT_DISPATCHER_SERVICE: &str = "event_dispatcher";

/// Tag for single-method event listeners.
pub const EVENT_LISTENER_TAG: &str = "kernel.event_listener";

/// Tag for event subscribers.
pub const EVENT_SUBSCRIBER_TAG: &str = "kernel.event_subscriber";

/// Interface an event subscriber class must implement.
pub const EVENT_SUBSCRIBER_INTERFACE: &str = "EventSubscriberInterface";

/// Parameter holding the event alias map.
pub const EVENT_ALIASES_PARAMETER: &str = "event_dispatcher.event_aliases";

/// Class of the per-event listener providers built for frozen events.
pub const LISTENER_PROVIDER_CLASS: &str = "ListenerProvider";

/// Event types too generic to infer a listener's event from.
pub const GENERIC_EVENT_TYPES: [&str; 2] = ["Event", "GenericEvent"];

/// Fallback listener method when no `on<Event>` method exists.
pub const INVOKE_METHOD: &str = "__invoke";

/// Tag marking workflow definition services.
pub const WORKFLOW_DEFINITION_TAG: &str = "workflow.definition";

/// Workflow type selecting the state-machine validator.
pub const STATE_MACHINE_TYPE: &str = "state_machine";

/// Marking stores that hold a single place at a time.
pub const SINGLE_STATE_MARKING_STORES: [&str; 2] = ["scalar", "single_state"];

/// Environment variable pointing at the compiler configuration file.
pub const CONFIG_PATH_ENV: &str = "DIWIRE_CONFIG_PATH";

/// Environment variable overriding the debug dump path.
pub const DEBUG_DUMP_ENV: &str = "DIWIRE_DEBUG_DUMP";

/// Environment variable overriding the frozen events (comma separated).
pub const FROZEN_EVENTS_ENV: &str = "DIWIRE_FROZEN_EVENTS";

/// Maximum Levenshtein distance for "did you mean" suggestions.
pub const SUGGESTION_MAX_DISTANCE: usize = 3;
