// factory.rs - Bounded resource factory
//
// Resources are addressed by name ("go.object"); the name's extension picks
// the registered resource type whose create callback turns raw bytes into a
// shared payload. Loads are cached by name, so repeated loads of the same
// resource hand out clones of one payload.

use crate::types::{resource_type_id, ResourceTypeId};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Failure signalled by a resource create callback.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ResourceCreateError {
    message: String,
}

impl ResourceCreateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Builds a payload from raw resource bytes.
pub type ResourceCreateFn = Box<dyn Fn(&[u8]) -> Result<Rc<dyn Any>, ResourceCreateError>>;

/// Tears a payload down when the factory releases it.
pub type ResourceDestroyFn = Box<dyn Fn(Rc<dyn Any>)>;

/// Errors raised while configuring a factory.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("resource type '{extension}' is already registered")]
    DuplicateType { extension: String },
}

/// Errors raised by [`Factory::load`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("resource '{name}' not found")]
    NotFound { name: String },

    #[error("resource '{name}' has no extension")]
    MissingExtension { name: String },

    #[error("no resource type registered for extension '{extension}' of '{name}'")]
    UnknownResourceType { name: String, extension: String },

    #[error("resource '{name}' failed to load")]
    CreateFailed {
        name: String,
        #[source]
        source: ResourceCreateError,
    },

    #[error("factory is at capacity ({max_resources} resources)")]
    CapacityExceeded { max_resources: usize },
}

/// Shared handle to a loaded resource payload.
#[derive(Clone)]
pub struct ResourceHandle {
    type_id: ResourceTypeId,
    payload: Rc<dyn Any>,
}

impl ResourceHandle {
    pub fn resource_type(&self) -> ResourceTypeId {
        self.type_id
    }

    /// Typed view of the payload. `None` if the payload is of another type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    pub fn payload(&self) -> &Rc<dyn Any> {
        &self.payload
    }
}

struct ResourceType {
    extension: String,
    create: ResourceCreateFn,
    destroy: Option<ResourceDestroyFn>,
}

/// Bounded resource factory.
///
/// Capacity is fixed at construction; loading beyond it fails with
/// [`LoadError::CapacityExceeded`]. Sources are an in-memory byte store
/// populated by [`Factory::insert_source`] (tests and tools mount data
/// directly; a disk-backed mount is a collaborator concern, not ours).
pub struct Factory {
    max_resources: usize,
    types: HashMap<ResourceTypeId, ResourceType>,
    sources: RefCell<HashMap<String, Vec<u8>>>,
    cache: RefCell<HashMap<String, ResourceHandle>>,
}

impl Factory {
    pub fn new(max_resources: usize) -> Self {
        Self {
            max_resources,
            types: HashMap::new(),
            sources: RefCell::new(HashMap::new()),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Register a resource type for an extension.
    ///
    /// Returns the process-wide tag for the extension. Registration happens
    /// once during setup; re-registering the same extension is an error.
    pub fn register_type(
        &mut self,
        extension: &str,
        create: ResourceCreateFn,
        destroy: Option<ResourceDestroyFn>,
    ) -> Result<ResourceTypeId, FactoryError> {
        let id = resource_type_id(extension);
        if self.types.contains_key(&id) {
            return Err(FactoryError::DuplicateType {
                extension: extension.to_string(),
            });
        }
        self.types.insert(
            id,
            ResourceType {
                extension: extension.to_string(),
                create,
                destroy,
            },
        );
        tracing::debug!(extension, tag = id, "registered resource type");
        Ok(id)
    }

    /// Tag for an extension, if this factory has a type registered for it.
    pub fn get_type_from_extension(&self, extension: &str) -> Option<ResourceTypeId> {
        let id = resource_type_id(extension);
        self.types.contains_key(&id).then_some(id)
    }

    /// Mount raw bytes under a resource name.
    pub fn insert_source(&self, name: &str, bytes: Vec<u8>) {
        self.sources.borrow_mut().insert(name.to_string(), bytes);
    }

    /// Load a named resource, materializing and caching it on first use.
    pub fn load(&self, name: &str) -> Result<ResourceHandle, LoadError> {
        if let Some(handle) = self.cache.borrow().get(name) {
            return Ok(handle.clone());
        }

        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .ok_or_else(|| LoadError::MissingExtension {
                name: name.to_string(),
            })?;
        let type_id = resource_type_id(&extension);
        let resource_type =
            self.types
                .get(&type_id)
                .ok_or_else(|| LoadError::UnknownResourceType {
                    name: name.to_string(),
                    extension,
                })?;

        if self.cache.borrow().len() >= self.max_resources {
            return Err(LoadError::CapacityExceeded {
                max_resources: self.max_resources,
            });
        }

        let sources = self.sources.borrow();
        let bytes = sources.get(name).ok_or_else(|| LoadError::NotFound {
            name: name.to_string(),
        })?;
        let payload = (resource_type.create)(bytes).map_err(|source| LoadError::CreateFailed {
            name: name.to_string(),
            source,
        })?;
        drop(sources);

        let handle = ResourceHandle { type_id, payload };
        self.cache
            .borrow_mut()
            .insert(name.to_string(), handle.clone());
        tracing::trace!(name, "resource loaded");
        Ok(handle)
    }

    /// Number of resources currently materialized.
    pub fn loaded_count(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl Drop for Factory {
    fn drop(&mut self) {
        for (name, handle) in self.cache.borrow_mut().drain() {
            if let Some(resource_type) = self.types.get(&handle.type_id) {
                if let Some(destroy) = &resource_type.destroy {
                    tracing::trace!(name = %name, extension = %resource_type.extension, "releasing resource");
                    destroy(handle.payload);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn text_type() -> ResourceCreateFn {
        Box::new(|bytes| {
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|_| ResourceCreateError::new("not utf-8"))?;
            Ok(Rc::new(text) as Rc<dyn Any>)
        })
    }

    #[test]
    fn load_and_cache() {
        let mut factory = Factory::new(4);
        factory.register_type("txt", text_type(), None).unwrap();
        factory.insert_source("hello.txt", b"hi".to_vec());

        let a = factory.load("hello.txt").unwrap();
        let b = factory.load("hello.txt").unwrap();
        assert_eq!(a.get::<String>().map(String::as_str), Some("hi"));
        assert!(Rc::ptr_eq(a.payload(), b.payload()));
        assert_eq!(factory.loaded_count(), 1);
    }

    #[test]
    fn missing_resource_is_not_found() {
        let mut factory = Factory::new(4);
        factory.register_type("txt", text_type(), None).unwrap();
        assert!(matches!(
            factory.load("absent.txt"),
            Err(LoadError::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let factory = Factory::new(4);
        factory.insert_source("a.bin", vec![0]);
        assert!(matches!(
            factory.load("a.bin"),
            Err(LoadError::UnknownResourceType { .. })
        ));
        assert!(matches!(
            factory.load("noextension"),
            Err(LoadError::MissingExtension { .. })
        ));
    }

    #[test]
    fn extension_lookup_requires_registration() {
        let mut factory = Factory::new(4);
        assert!(factory.get_type_from_extension("txt").is_none());
        let tag = factory.register_type("txt", text_type(), None).unwrap();
        assert_eq!(factory.get_type_from_extension("txt"), Some(tag));
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let mut factory = Factory::new(4);
        factory.register_type("txt", text_type(), None).unwrap();
        assert!(matches!(
            factory.register_type("txt", text_type(), None),
            Err(FactoryError::DuplicateType { .. })
        ));
    }

    #[test]
    fn capacity_is_bounded() {
        let mut factory = Factory::new(1);
        factory.register_type("txt", text_type(), None).unwrap();
        factory.insert_source("a.txt", b"a".to_vec());
        factory.insert_source("b.txt", b"b".to_vec());
        factory.load("a.txt").unwrap();
        assert!(matches!(
            factory.load("b.txt"),
            Err(LoadError::CapacityExceeded { .. })
        ));
        // The cached resource is unaffected.
        assert!(factory.load("a.txt").is_ok());
    }

    #[test]
    fn create_failure_propagates() {
        let mut factory = Factory::new(4);
        factory.register_type("txt", text_type(), None).unwrap();
        factory.insert_source("bad.txt", vec![0xff, 0xfe]);
        assert!(matches!(
            factory.load("bad.txt"),
            Err(LoadError::CreateFailed { .. })
        ));
        assert_eq!(factory.loaded_count(), 0);
    }

    #[test]
    fn destroy_runs_at_teardown() {
        let destroyed = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&destroyed);
        {
            let mut factory = Factory::new(4);
            factory
                .register_type(
                    "txt",
                    text_type(),
                    Some(Box::new(move |_| counter.set(counter.get() + 1))),
                )
                .unwrap();
            factory.insert_source("a.txt", b"a".to_vec());
            factory.load("a.txt").unwrap();
        }
        assert_eq!(destroyed.get(), 1);
    }
}
