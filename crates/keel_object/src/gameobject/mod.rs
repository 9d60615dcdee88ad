//! Game-object lifecycle core.
//!
//! A [`Collection`] owns a bounded table of instances addressed by
//! generation-tagged [`InstanceId`] handles. Component behaviour is supplied
//! externally through a [`ComponentRegistry`] of typed callbacks. Each tick
//! is two phases: [`Collection::update`] runs every registered component
//! type's update callback (which may freely spawn and delete), and
//! [`Collection::post_update`] commits the deletions collected during the
//! pass. Marked instances stay resolvable until then, double deletes
//! collapse to one, and freed slots are never reused within the tick that
//! freed them.

mod collection;
mod component;
mod error;
mod instance;
pub mod prototype;
mod table;

pub use collection::Collection;
pub use component::{
    ComponentData, ComponentError, ComponentRegistry, ComponentType, ComponentWorld,
    RegistrationError,
};
pub use error::{SpawnError, UpdateError};
pub use instance::{Instance, InstanceId};
pub use prototype::Prototype;
pub use table::{CapacityError, InstanceTable};
