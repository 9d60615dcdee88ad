//! Keel Object Runtime
//!
//! Contains the simulation-object core:
//! - Generation-tagged instance handles and bounded instance tables
//! - Component type registry with create/destroy/update callbacks
//! - Collections with the two-phase Update/PostUpdate tick and
//!   deferred deletion

pub mod gameobject;
pub mod math;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
