// component.rs - Component type descriptors and the registry
//
// A component type binds a resource type tag to create/destroy/update
// callbacks. Callbacks are boxed closures; whatever private state a
// component kind needs rides in the closure environment, opaque to the
// core. Per-collection state lives in an explicit "world" built by
// `create_world` when a collection binds the registry.

use crate::gameobject::collection::Collection;
use crate::gameobject::instance::InstanceId;
use crate::time::UpdateContext;
use keel_resource::{ResourceHandle, ResourceTypeId};
use std::any::Any;
use std::cell::{RefCell, RefMut};
use std::collections::HashMap;
use thiserror::Error;

/// Opaque per-instance component state.
pub type ComponentData = Box<dyn Any>;

/// Failure signalled by a component callback.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ComponentError {
    message: String,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-collection state for one component kind.
///
/// The world sits behind a cell so it stays reachable from every callback
/// path, including a spawn made from inside the owning kind's own update.
/// Borrows are scoped per call: a callback holding a borrow must release it
/// before spawning or destroying an object carrying a component of the same
/// kind, or the nested borrow panics.
pub struct ComponentWorld {
    state: RefCell<Box<dyn Any>>,
}

impl ComponentWorld {
    pub(crate) fn new(state: Box<dyn Any>) -> Self {
        Self {
            state: RefCell::new(state),
        }
    }

    /// Mutable typed view of the world. `None` if the state is of another type.
    pub fn borrow_mut<T: 'static>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.state.borrow_mut(), |state| state.downcast_mut::<T>()).ok()
    }
}

/// Builds one instance's component state from its backing resource.
pub type CreateFn = Box<
    dyn Fn(InstanceId, &ResourceHandle, Option<&ComponentWorld>) -> Result<ComponentData, ComponentError>,
>;

/// Tears one instance's component state down.
pub type DestroyFn = Box<dyn Fn(ComponentData, Option<&ComponentWorld>)>;

/// Per-tick update for a component type. Called once per tick with the whole
/// collection; the callback iterates instances itself and may freely call
/// [`Collection::spawn`] and [`Collection::delete`].
pub type UpdateFn = Box<
    dyn Fn(&mut Collection, &UpdateContext, Option<&ComponentWorld>) -> Result<(), ComponentError>,
>;

/// Builds the per-collection world for a component type.
pub type CreateWorldFn = Box<dyn Fn() -> Box<dyn Any>>;

/// Descriptor for a registered kind of component.
pub struct ComponentType {
    name: String,
    resource_type: ResourceTypeId,
    create: Option<CreateFn>,
    destroy: Option<DestroyFn>,
    create_world: Option<CreateWorldFn>,
    update: Option<UpdateFn>,
}

impl ComponentType {
    /// Create a descriptor binding a name to a resource type tag.
    pub fn new(name: impl Into<String>, resource_type: ResourceTypeId) -> Self {
        Self {
            name: name.into(),
            resource_type,
            create: None,
            destroy: None,
            create_world: None,
            update: None,
        }
    }

    pub fn with_create<F>(mut self, f: F) -> Self
    where
        F: Fn(InstanceId, &ResourceHandle, Option<&ComponentWorld>) -> Result<ComponentData, ComponentError>
            + 'static,
    {
        self.create = Some(Box::new(f));
        self
    }

    pub fn with_destroy<F>(mut self, f: F) -> Self
    where
        F: Fn(ComponentData, Option<&ComponentWorld>) + 'static,
    {
        self.destroy = Some(Box::new(f));
        self
    }

    /// Attach a per-collection world constructor.
    pub fn with_world<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Box<dyn Any> + 'static,
    {
        self.create_world = Some(Box::new(f));
        self
    }

    pub fn with_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Collection, &UpdateContext, Option<&ComponentWorld>) -> Result<(), ComponentError>
            + 'static,
    {
        self.update = Some(Box::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> ResourceTypeId {
        self.resource_type
    }

    pub(crate) fn create(&self) -> Option<&CreateFn> {
        self.create.as_ref()
    }

    pub(crate) fn destroy(&self) -> Option<&DestroyFn> {
        self.destroy.as_ref()
    }

    pub(crate) fn create_world(&self) -> Option<&CreateWorldFn> {
        self.create_world.as_ref()
    }

    pub(crate) fn update(&self) -> Option<&UpdateFn> {
        self.update.as_ref()
    }
}

/// Errors that can occur while registering a component type.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("component type '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("resource type of component '{requested}' is already claimed by '{existing}'")]
    DuplicateResourceType { requested: String, existing: String },
}

/// Ordered registry of component types.
///
/// Registration order is update order, every tick; replay determinism
/// depends on it. The registry is written once during setup
/// and shared read-only with collections; it is never mutated mid-tick.
#[derive(Default)]
pub struct ComponentRegistry {
    types: Vec<ComponentType>,
    name_lookup: HashMap<String, usize>,
    resource_lookup: HashMap<ResourceTypeId, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type, returning its kind index.
    pub fn register(&mut self, component_type: ComponentType) -> Result<usize, RegistrationError> {
        if self.name_lookup.contains_key(component_type.name()) {
            return Err(RegistrationError::DuplicateName {
                name: component_type.name().to_string(),
            });
        }
        if let Some(&existing) = self.resource_lookup.get(&component_type.resource_type()) {
            return Err(RegistrationError::DuplicateResourceType {
                requested: component_type.name().to_string(),
                existing: self.types[existing].name().to_string(),
            });
        }

        let kind = self.types.len();
        self.name_lookup
            .insert(component_type.name().to_string(), kind);
        self.resource_lookup
            .insert(component_type.resource_type(), kind);
        tracing::debug!(name = component_type.name(), kind, "registered component type");
        self.types.push(component_type);
        Ok(kind)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, kind: usize) -> Option<&ComponentType> {
        self.types.get(kind)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ComponentType> {
        self.name_lookup.get(name).map(|&kind| &self.types[kind])
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentType> {
        self.types.iter()
    }

    /// Component kind bound to a resource type tag.
    pub fn type_for_resource(&self, resource_type: ResourceTypeId) -> Option<(usize, &ComponentType)> {
        self.resource_lookup
            .get(&resource_type)
            .map(|&kind| (kind, &self.types[kind]))
    }
}
