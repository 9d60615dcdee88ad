//! Keel Resource Pipeline
//!
//! Resource type registration and loading. A [`Factory`] owns a bounded set
//! of named resources, each materialized through the create callback of its
//! registered resource type. Resource-type tags are interned process-wide so
//! that registries built against one factory resolve against any other.

mod factory;
mod types;

pub use factory::{
    Factory, FactoryError, LoadError, ResourceCreateError, ResourceCreateFn, ResourceDestroyFn,
    ResourceHandle,
};
pub use types::{extension_of, resource_type_id, ResourceTypeId};
