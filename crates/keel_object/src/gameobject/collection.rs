// collection.rs - Bounded collection of game objects and the two-phase tick
//
// Deletion is deferred: `delete` only marks, `post_update` commits. The
// pending flag on the instance is the delete queue's set membership test,
// so double deletes collapse to one entry without hashing. All destroy
// callbacks for a drain run before any slot is recycled, so every handle
// still resolves to pre-deletion state mid-drain.

use crate::gameobject::component::{ComponentData, ComponentRegistry, ComponentWorld};
use crate::gameobject::error::{SpawnError, UpdateError};
use crate::gameobject::instance::{Instance, InstanceId};
use crate::gameobject::prototype::Prototype;
use crate::gameobject::table::InstanceTable;
use crate::time::UpdateContext;
use glam::{Affine3A, Quat, Vec3};
use keel_resource::Factory;
use std::mem;
use std::rc::Rc;

/// A bounded-capacity container of game objects, updated once per tick.
///
/// The instance table and delete queue are owned exclusively by the
/// collection; all mutation goes through [`spawn`](Self::spawn),
/// [`delete`](Self::delete), [`update`](Self::update) and
/// [`post_update`](Self::post_update). The registry and factory are shared,
/// read-only collaborators.
pub struct Collection {
    factory: Rc<Factory>,
    registry: Rc<ComponentRegistry>,
    table: InstanceTable,
    delete_queue: Vec<InstanceId>,
    /// Per-component-kind world state, index-aligned with the registry.
    /// Worlds sit behind cells so a spawn made from inside a kind's own
    /// update still reaches that kind's world. `None` for kinds without one.
    worlds: Vec<Option<Rc<ComponentWorld>>>,
}

impl Collection {
    /// Create a collection with a fixed instance capacity.
    pub fn new(
        factory: Rc<Factory>,
        registry: Rc<ComponentRegistry>,
        max_instances: usize,
    ) -> Self {
        let worlds = registry
            .iter()
            .map(|ty| {
                ty.create_world()
                    .map(|build| Rc::new(ComponentWorld::new(build())))
            })
            .collect();
        tracing::debug!(max_instances, component_types = registry.len(), "new collection");
        Self {
            factory,
            registry,
            table: InstanceTable::new(max_instances),
            delete_queue: Vec::new(),
            worlds,
        }
    }

    /// Spawn an instance from a named prototype.
    ///
    /// Component create callbacks run in prototype order. Failure is atomic:
    /// components already created are destroyed in reverse order and the
    /// slot is recycled before the error is returned.
    ///
    /// An instance spawned during an update pass joins the live set
    /// immediately and is therefore seen by component-update steps that have
    /// not yet run this tick.
    pub fn spawn(&mut self, prototype: &str) -> Result<InstanceId, SpawnError> {
        let prototype_handle =
            self.factory
                .load(prototype)
                .map_err(|source| SpawnError::PrototypeNotFound {
                    name: prototype.to_string(),
                    source,
                })?;
        let proto = prototype_handle
            .get::<Prototype>()
            .ok_or_else(|| SpawnError::InvalidPrototype {
                resource: prototype.to_string(),
            })?;

        let id = self
            .table
            .allocate()
            .map_err(|e| SpawnError::CapacityExceeded {
                capacity: e.capacity,
            })?;

        let factory = Rc::clone(&self.factory);
        let registry = Rc::clone(&self.registry);
        let mut created: Vec<(usize, ComponentData)> = Vec::with_capacity(proto.components.len());
        let mut failure = None;

        for resource_name in &proto.components {
            let resource = match factory.load(resource_name) {
                Ok(handle) => handle,
                Err(source) => {
                    failure = Some(SpawnError::ResourceNotFound {
                        resource: resource_name.clone(),
                        source,
                    });
                    break;
                }
            };
            let Some((kind, ty)) = registry.type_for_resource(resource.resource_type()) else {
                failure = Some(SpawnError::UnknownComponentType {
                    resource: resource_name.clone(),
                });
                break;
            };
            let data = match ty.create() {
                Some(create) => match create(id, &resource, self.worlds[kind].as_deref()) {
                    Ok(data) => data,
                    Err(source) => {
                        failure = Some(SpawnError::ComponentCreateFailed {
                            component: ty.name().to_string(),
                            source,
                        });
                        break;
                    }
                },
                // No create callback: attach unit state so destroy ordering
                // and counting still see this component.
                None => Box::new(()),
            };
            created.push((kind, data));
        }

        if let Some(error) = failure {
            for (kind, data) in created.into_iter().rev() {
                if let Some(ty) = registry.get(kind) {
                    if let Some(destroy) = ty.destroy() {
                        destroy(data, self.worlds[kind].as_deref());
                    }
                }
            }
            self.table.recycle(id.index());
            tracing::debug!(prototype, error = %error, "spawn rolled back");
            return Err(error);
        }

        let instance = self
            .table
            .get_mut(id)
            .expect("slot allocated this call must resolve");
        instance.components = created;
        tracing::trace!(prototype, index = id.index(), "instance spawned");
        Ok(id)
    }

    /// Mark an instance for deletion at the next [`post_update`](Self::post_update).
    ///
    /// Idempotent and safe on any handle: a second call on the same handle,
    /// or a call on a stale or unknown handle, is a no-op, never an error.
    /// The instance stays resolvable until the mark is committed.
    pub fn delete(&mut self, id: InstanceId) {
        if let Some(instance) = self.table.get_mut(id) {
            if !instance.pending_delete {
                instance.pending_delete = true;
                self.delete_queue.push(id);
                tracing::trace!(index = id.index(), "instance marked for deletion");
            }
        }
    }

    /// Phase one of a tick: run every registered component type's update
    /// callback, in registration order.
    ///
    /// Callbacks may spawn and delete freely. The first failure aborts the
    /// remaining steps for this tick; state already mutated by earlier steps
    /// stays (partial-update semantics). The collection remains usable for
    /// subsequent ticks either way.
    pub fn update(&mut self, context: &UpdateContext) -> Result<(), UpdateError> {
        let registry = Rc::clone(&self.registry);
        for (kind, ty) in registry.iter().enumerate() {
            let Some(update) = ty.update() else {
                continue;
            };
            let world = self.worlds[kind].clone();
            let result = update(self, context, world.as_deref());
            if let Err(source) = result {
                tracing::warn!(component = ty.name(), error = %source, "component update failed; tick aborted");
                return Err(UpdateError::ComponentUpdateFailed {
                    component: ty.name().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// Phase two of a tick: commit every deletion requested since the last
    /// drain.
    ///
    /// The queue is drained exactly once. Destroy callbacks run in
    /// reverse-creation order per instance, and every queued handle is
    /// resolved before any slot is recycled. Afterwards the queue is empty
    /// and [`live_count`](Self::live_count) reflects all requested deletions.
    pub fn post_update(&mut self) -> Result<(), UpdateError> {
        if self.delete_queue.is_empty() {
            return Ok(());
        }
        let queue = mem::take(&mut self.delete_queue);
        let mut doomed = Vec::with_capacity(queue.len());
        for id in queue {
            // Safety net: nothing is recycled until the whole queue has been
            // destroyed, so a non-resolving entry can only be a handle that
            // was already stale when it was marked.
            if !self.table.contains(id) {
                continue;
            }
            self.destroy_components(id);
            doomed.push(id.index());
        }
        let destroyed = doomed.len();
        for index in doomed {
            self.table.recycle(index);
        }
        tracing::debug!(destroyed, live = self.table.live_count(), "post-update drain");
        Ok(())
    }

    /// Run destroy callbacks for an instance's components, newest first.
    fn destroy_components(&mut self, id: InstanceId) {
        let components = match self.table.get_mut(id) {
            Some(instance) => mem::take(&mut instance.components),
            None => return,
        };
        let registry = Rc::clone(&self.registry);
        for (kind, data) in components.into_iter().rev() {
            if let Some(ty) = registry.get(kind) {
                if let Some(destroy) = ty.destroy() {
                    destroy(data, self.worlds[kind].as_deref());
                }
            }
        }
    }

    /// Resolve a handle to its instance. `None` for stale or unknown handles.
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.table.get(id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.table.contains(id)
    }

    pub fn live_count(&self) -> usize {
        self.table.live_count()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Handles of all live instances, in slot order. Includes instances
    /// marked for deletion but not yet committed.
    pub fn live_handles(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.table.live_handles()
    }

    pub fn position(&self, id: InstanceId) -> Option<Vec3> {
        self.table.get(id).map(Instance::position)
    }

    /// No-op on a stale or unknown handle.
    pub fn set_position(&mut self, id: InstanceId, position: Vec3) {
        if let Some(instance) = self.table.get_mut(id) {
            instance.set_position(position);
        }
    }

    pub fn rotation(&self, id: InstanceId) -> Option<Quat> {
        self.table.get(id).map(Instance::rotation)
    }

    /// No-op on a stale or unknown handle.
    pub fn set_rotation(&mut self, id: InstanceId, rotation: Quat) {
        if let Some(instance) = self.table.get_mut(id) {
            instance.set_rotation(rotation);
        }
    }

    pub fn world_transform(&self, id: InstanceId) -> Option<Affine3A> {
        self.table.get(id).map(Instance::world_transform)
    }

    /// Whether an instance is marked for deletion. `false` for stale handles.
    pub fn is_pending_delete(&self, id: InstanceId) -> bool {
        self.table.get(id).is_some_and(Instance::pending_delete)
    }
}

impl Drop for Collection {
    /// Destroys all remaining live instances through the regular
    /// reverse-order destroy path, then releases storage.
    fn drop(&mut self) {
        let live: Vec<InstanceId> = self.table.live_handles().collect();
        if live.is_empty() {
            return;
        }
        tracing::debug!(live = live.len(), "collection teardown");
        for id in &live {
            self.destroy_components(*id);
        }
        for id in live {
            self.table.recycle(id.index());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameobject::component::{ComponentError, ComponentType};
    use crate::gameobject::prototype;
    use std::cell::RefCell;

    fn empty_prototype_factory() -> Rc<Factory> {
        let mut factory = Factory::new(8);
        prototype::register_resource_types(&mut factory).unwrap();
        factory.insert_source("empty.object", b"{}".to_vec());
        Rc::new(factory)
    }

    #[test]
    fn spawn_of_unknown_prototype_fails() {
        let factory = empty_prototype_factory();
        let registry = Rc::new(ComponentRegistry::new());
        let mut collection = Collection::new(factory, registry, 4);
        assert!(matches!(
            collection.spawn("missing.object"),
            Err(SpawnError::PrototypeNotFound { .. })
        ));
        assert_eq!(collection.live_count(), 0);
    }

    #[test]
    fn componentless_instance_lifecycle() {
        let factory = empty_prototype_factory();
        let registry = Rc::new(ComponentRegistry::new());
        let mut collection = Collection::new(factory, registry, 4);
        let id = collection.spawn("empty.object").unwrap();
        collection.set_position(id, Vec3::splat(2.0));
        assert_eq!(collection.position(id), Some(Vec3::splat(2.0)));
        collection.delete(id);
        assert!(collection.is_pending_delete(id));
        collection.post_update().unwrap();
        assert_eq!(collection.position(id), None);
        assert_eq!(collection.live_count(), 0);
    }

    #[test]
    fn update_failure_aborts_remaining_steps() {
        let mut factory = Factory::new(8);
        prototype::register_resource_types(&mut factory).unwrap();

        let order = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ComponentRegistry::new();
        let first = Rc::clone(&order);
        registry
            .register(
                ComponentType::new("first", keel_resource::resource_type_id("col_first"))
                    .with_update(move |_, _, _| {
                        first.borrow_mut().push("first");
                        Err(ComponentError::new("boom"))
                    }),
            )
            .unwrap();
        let second = Rc::clone(&order);
        registry
            .register(
                ComponentType::new("second", keel_resource::resource_type_id("col_second"))
                    .with_update(move |_, _, _| {
                        second.borrow_mut().push("second");
                        Ok(())
                    }),
            )
            .unwrap();

        let mut collection = Collection::new(Rc::new(factory), Rc::new(registry), 4);
        let err = collection.update(&UpdateContext::fixed()).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::ComponentUpdateFailed { ref component, .. } if component == "first"
        ));
        assert_eq!(*order.borrow(), vec!["first"]);

        // The collection stays usable; next tick runs from the top.
        order.borrow_mut().clear();
        let _ = collection.update(&UpdateContext::fixed());
        assert_eq!(*order.borrow(), vec!["first"]);
    }
}
