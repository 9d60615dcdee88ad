use crate::gameobject::component::ComponentError;
use keel_resource::LoadError;
use thiserror::Error;

/// Errors reported by [`Collection::spawn`](crate::gameobject::Collection::spawn).
///
/// Each is fatal to that single call only; the collection stays usable.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("collection is at capacity ({capacity} instances)")]
    CapacityExceeded { capacity: usize },

    #[error("prototype '{name}' could not be loaded")]
    PrototypeNotFound {
        name: String,
        #[source]
        source: LoadError,
    },

    #[error("resource '{resource}' does not describe a prototype")]
    InvalidPrototype { resource: String },

    #[error("component resource '{resource}' could not be loaded")]
    ResourceNotFound {
        resource: String,
        #[source]
        source: LoadError,
    },

    #[error("no component type registered for resource '{resource}'")]
    UnknownComponentType { resource: String },

    #[error("component '{component}' failed to create")]
    ComponentCreateFailed {
        component: String,
        #[source]
        source: ComponentError,
    },
}

/// Errors reported by the tick driver entry points.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("component '{component}' update failed")]
    ComponentUpdateFailed {
        component: String,
        #[source]
        source: ComponentError,
    },
}
