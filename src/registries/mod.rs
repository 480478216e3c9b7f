//! # Registries
//!
//! One registry per handler family, plus the owner resolver used for
//! dynamic component delegation. Registries are cleared and repopulated by
//! each directory load; individual slots are replaced in place by the
//! hot-reload coordinator, which is their only steady-state writer.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod commands;
pub mod components;
pub mod events;
pub mod resolver;

pub use commands::{CommandRegistry, RELOAD_DEBOUNCE};
pub use components::ComponentRegistry;
pub use events::EventRegistry;
pub use resolver::resolve_owner;
