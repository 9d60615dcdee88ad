// types.rs - Process-wide resource-type tag interning
//
// Tags are small integers, not Rust TypeIds, so that component registries
// and factories built in different places agree on what a "prototype" or a
// "script" resource is for the life of the process.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::RwLock;

/// Interned tag identifying a resource type (e.g. the `"object"` extension).
pub type ResourceTypeId = u32;

#[derive(Default)]
struct TagTable {
    by_extension: HashMap<String, ResourceTypeId>,
    extensions: Vec<String>,
}

/// Global tag table. Written during setup, read-only during simulation.
static TAGS: Lazy<RwLock<TagTable>> = Lazy::new(|| RwLock::new(TagTable::default()));

/// Intern an extension, returning its stable process-wide tag.
///
/// Interning the same extension twice returns the same tag.
pub fn resource_type_id(extension: &str) -> ResourceTypeId {
    if let Some(&id) = TAGS.read().unwrap().by_extension.get(extension) {
        return id;
    }
    let mut table = TAGS.write().unwrap();
    // Re-check under the write lock: another caller may have interned it.
    if let Some(&id) = table.by_extension.get(extension) {
        return id;
    }
    let id = table.extensions.len() as ResourceTypeId;
    table.extensions.push(extension.to_string());
    table.by_extension.insert(extension.to_string(), id);
    id
}

/// Reverse lookup of a tag's extension, mainly for diagnostics.
pub fn extension_of(id: ResourceTypeId) -> Option<String> {
    TAGS.read().unwrap().extensions.get(id as usize).cloned()
}
