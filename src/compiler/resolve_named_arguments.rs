//! Turns `$name` and type-hint argument keys into positions.
//!
//! Constructor arguments are matched against the factory method when the definition
//! has one and against the class constructor otherwise. Method-call arguments are
//! matched against the called method. Keys come in two shapes:
//!
//! - `$name` selects the parameter with that name
//! - a bare type such as `App.Transport` selects the first parameter type-hinted
//!   with it, and its value must be a reference, an inline definition or null
//!
//! Positional entries are kept where they are and the result is sorted by position.
//! Gaps are left for `CheckArgumentsValidityPass` to report.

use super::CompilerPass;
use super::visitor::{RecursivePass, VisitContext, process_container, walk_definition};
use crate::container::{ContainerBuilder, Signature};
use crate::core::{DiError, Result};
use crate::definition::{ArgumentKey, Arguments, Definition};

/// Fails with [`DiError::InvalidService`] naming the service when a key matches no
/// parameter, and with [`DiError::ClassNotFound`] when the class has no schema.
#[derive(Debug, Default)]
pub struct ResolveNamedArgumentsPass;

impl ResolveNamedArgumentsPass {
    pub fn new() -> Self {
        Self
    }
}

fn resolve_arguments(
    arguments: Arguments,
    signature: &Signature,
    method: &str,
    service_id: &str,
) -> Result<Arguments> {
    let mut resolved = Arguments::new();

    for (key, value) in arguments.into_entries() {
        let name = match key {
            ArgumentKey::Index(index) => {
                resolved.set(index, value);
                continue;
            }
            ArgumentKey::Named(name) => name,
        };

        let position = if let Some(parameter_name) = name.strip_prefix('$') {
            signature.iter().position(|p| p.name == parameter_name).ok_or_else(|| {
                DiError::InvalidService {
                    service_id: service_id.to_string(),
                    reason: format!(
                        "method \"{method}()\" has no argument named \"{name}\". Check your service definition."
                    ),
                }
            })?
        } else {
            if !value.is_injectable_by_type() {
                return Err(DiError::InvalidService {
                    service_id: service_id.to_string(),
                    reason: format!(
                        "the value of argument \"{name}\" of method \"{method}()\" must be null, a reference or an inline definition, {} given.",
                        value.type_name()
                    ),
                });
            }
            signature
                .iter()
                .position(|p| p.service_type() == Some(name.as_str()))
                .ok_or_else(|| DiError::InvalidService {
                    service_id: service_id.to_string(),
                    reason: format!(
                        "method \"{method}()\" has no argument type-hinted as \"{name}\". Check your service definition."
                    ),
                })?
        };

        resolved.set(position, value);
    }

    resolved.sort_keys();
    Ok(resolved)
}

impl RecursivePass for ResolveNamedArgumentsPass {
    fn process_definition(
        &mut self,
        mut definition: Definition,
        ctx: &mut VisitContext<'_>,
    ) -> Result<Definition> {
        let container = ctx.container;
        let service_id = ctx.current_id.clone();

        if !definition.arguments.named_keys().is_empty() {
            let (method, signature) = container
                .constructor_signature(&definition, &service_id)?
                .ok_or_else(|| DiError::InvalidService {
                    service_id: service_id.clone(),
                    reason: "named arguments need a class or a factory to resolve against".to_string(),
                })?;
            let arguments = std::mem::take(&mut definition.arguments);
            definition.arguments = resolve_arguments(arguments, &signature, &method, &service_id)?;
        }

        let mut calls = std::mem::take(&mut definition.calls);
        for call in &mut calls {
            if call.arguments.named_keys().is_empty() {
                continue;
            }
            let signature = container.method_signature(&definition, &service_id, &call.method)?;
            let arguments = std::mem::take(&mut call.arguments);
            call.arguments = resolve_arguments(arguments, &signature, &call.method, &service_id)?;
        }
        definition.calls = calls;

        walk_definition(self, definition, ctx)
    }
}

impl CompilerPass for ResolveNamedArgumentsPass {
    fn name(&self) -> &'static str {
        "ResolveNamedArgumentsPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        process_container(self, container)
    }
}
