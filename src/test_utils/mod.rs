//! Test utilities shared by unit and integration tests.
//!
//! Available to the crate's own tests and, through the `test-utils` feature, to the
//! `tests/` suites.

pub mod fixtures;

pub use fixtures::ContainerFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::container::{ClassMetadata, ContainerBuilder, Parameter};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, else `RUST_LOG`;
/// with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=diwire=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Register a class whose constructor takes `parameters` as `(name, type)` pairs; an
/// empty type leaves the parameter untyped.
pub fn register_class(container: &mut ContainerBuilder, class: &str, parameters: &[(&str, &str)]) {
    let constructor = parameters
        .iter()
        .map(|(name, type_hint)| {
            if type_hint.is_empty() {
                Parameter::new(*name)
            } else {
                Parameter::typed(*name, *type_hint)
            }
        })
        .collect();
    container.classes_mut().register(ClassMetadata::new(class).with_constructor(constructor));
}
