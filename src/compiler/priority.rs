//! Priority-sorted lookup of tagged services.

use std::collections::HashSet;

use crate::container::ContainerBuilder;
use crate::core::Result;
use crate::definition::{Reference, Value, tag};

/// References to the services tagged `tag`, highest priority first.
///
/// A service tagged several times is ranked by each occurrence's priority but appears
/// only once, at its best position. Services with equal priority keep registration
/// order.
///
/// # Errors
///
/// Returns [`crate::core::DiError::InvalidTagAttribute`] for a `priority` that is not
/// an integer, and [`crate::core::DiError::AbstractTaggedService`] when an abstract
/// definition carries the tag.
pub fn find_and_sort_tagged_services(container: &ContainerBuilder, tag_name: &str) -> Result<Vec<Value>> {
    let mut ranked: Vec<(i64, String)> = Vec::new();
    for (service_id, occurrences) in container.find_tagged_service_ids(tag_name, true)? {
        for attributes in &occurrences {
            let priority = tag::priority(attributes, tag_name, &service_id)?;
            ranked.push((priority, service_id.clone()));
        }
    }

    ranked.sort_by(|(a, _), (b, _)| b.cmp(a));

    let mut seen = HashSet::with_capacity(ranked.len());
    Ok(ranked
        .into_iter()
        .filter(|(_, service_id)| seen.insert(service_id.clone()))
        .map(|(_, service_id)| Value::Reference(Reference::new(service_id)))
        .collect())
}
