//! Instance handle and per-object state
//!
//! Handles are lightweight (8 bytes) generation-tagged indices into a
//! collection's instance table. The generation counter prevents
//! use-after-free: a handle resolves only while the slot's generation
//! still matches.

use crate::gameobject::component::ComponentData;
use glam::{Affine3A, Quat, Vec3};

/// Instance handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: slot position in the collection's instance table
/// - Generation: incremented every time the slot is recycled
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId {
    index: u32,
    generation: u32,
}

impl InstanceId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for networking/save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

/// Per-object state, owned exclusively by the collection's table.
pub struct Instance {
    position: Vec3,
    rotation: Quat,
    /// Component-kind index + opaque component state, in creation order.
    pub(crate) components: Vec<(usize, ComponentData)>,
    /// Set by `Collection::delete`; cleared only when the slot is recycled.
    pub(crate) pending_delete: bool,
}

impl Instance {
    pub(crate) fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            components: Vec::new(),
            pending_delete: false,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    /// Object-to-world transform derived from position and rotation.
    pub fn world_transform(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.position)
    }

    pub fn pending_delete(&self) -> bool {
        self.pending_delete
    }
}
