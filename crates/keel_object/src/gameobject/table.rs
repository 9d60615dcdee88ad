// table.rs - Sparse instance storage with slot recycling
//
// Slots are addressed by index and tagged with a generation; a handle is
// valid only while the generations match. Freed slots go through a LIFO
// free list. Recycling happens exclusively from PostUpdate (or collection
// teardown), which is what keeps a freed index from being reused within
// the tick that freed it.

use crate::gameobject::instance::{Instance, InstanceId};
use thiserror::Error;

/// `allocate` failed because every slot up to the fixed capacity is live.
#[derive(Debug, Error)]
#[error("instance table is at capacity ({capacity} slots)")]
pub struct CapacityError {
    pub capacity: usize,
}

struct Slot {
    generation: u32,
    instance: Option<Instance>,
}

/// Bounded sparse array of instance slots with O(1) allocate and recycle.
pub struct InstanceTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    capacity: usize,
}

impl InstanceTable {
    /// Create a table with a fixed capacity. Slots are grown lazily.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        assert!(
            capacity <= u32::MAX as usize,
            "capacity cannot exceed u32::MAX"
        );
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
        }
    }

    /// Allocate a slot, reusing the free list before growing the live region.
    pub fn allocate(&mut self) -> Result<InstanceId, CapacityError> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.instance = Some(Instance::new());
            Ok(InstanceId::new(index, slot.generation))
        } else if self.slots.len() < self.capacity {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                instance: Some(Instance::new()),
            });
            Ok(InstanceId::new(index, 0))
        } else {
            Err(CapacityError {
                capacity: self.capacity,
            })
        }
    }

    /// Resolve a handle. `None` on out-of-range index, generation mismatch,
    /// or an empty slot; this is what makes stale handles safe to hold.
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.instance.as_ref()
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.instance.as_mut()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.get(id).is_some()
    }

    /// Clear a slot, bump its generation, and return the index to the free
    /// list. Outstanding handles to the old occupant stop resolving.
    pub(crate) fn recycle(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.instance.is_some(), "recycling an empty slot");
        slot.instance = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handles of all live instances, in slot order.
    pub fn live_handles(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.instance
                .as_ref()
                .map(|_| InstanceId::new(index as u32, slot.generation))
        })
    }
}
