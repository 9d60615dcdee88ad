//! Game-object prototypes.
//!
//! A prototype is the resource an instance is spawned from: a JSON list of
//! component resource names. Each listed resource's type tag selects the
//! component kind attached to the instance, in list order.

use keel_resource::{Factory, FactoryError, ResourceCreateError, ResourceTypeId};
use serde::Deserialize;
use std::any::Any;
use std::rc::Rc;

/// Extension of prototype resources (`"player.object"`).
pub const PROTOTYPE_EXTENSION: &str = "object";

/// Deserialized prototype payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Prototype {
    /// Component resource names, in attachment order.
    #[serde(default)]
    pub components: Vec<String>,
}

/// Register the game-object resource types with a factory.
///
/// Call once per factory during setup, before any collection spawns from it.
pub fn register_resource_types(factory: &mut Factory) -> Result<ResourceTypeId, FactoryError> {
    factory.register_type(
        PROTOTYPE_EXTENSION,
        Box::new(|bytes| {
            let prototype: Prototype = serde_json::from_slice(bytes)
                .map_err(|e| ResourceCreateError::new(format!("invalid prototype: {e}")))?;
            Ok(Rc::new(prototype) as Rc<dyn Any>)
        }),
        None,
    )
}
