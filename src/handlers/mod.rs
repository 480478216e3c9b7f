//! # Handler Model
//!
//! Capability traits for the three handler families, the ownership wrapper
//! registries store, and the constructor registry the loader consults.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod command;
pub mod component;
pub mod event;
pub mod factory;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

pub use command::{
    CommandHandler, CommandPermission, CommandScope, ComponentAction, ComponentEntry,
    ComponentMap, PermissionTarget, SlashData,
};
pub use component::{ComponentHandler, ComponentKind};
pub use event::{EventHandler, EventType, GatewayEvent};
pub use factory::{FactoryContext, FactoryRegistry, HandlerFactory};

/// Which handler family a directory load expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerVariant {
    Command,
    Component,
    Event,
}

impl fmt::Display for HandlerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerVariant::Command => "command",
            HandlerVariant::Component => "component",
            HandlerVariant::Event => "event",
        };
        f.write_str(name)
    }
}

/// A freshly instantiated handler of any family, as produced by a
/// constructor.
pub enum Handler<D> {
    Command(Arc<dyn CommandHandler<D>>),
    Component(Arc<dyn ComponentHandler<D>>),
    Event(Arc<dyn EventHandler<D>>),
}

impl<D> Handler<D> {
    pub fn variant(&self) -> HandlerVariant {
        match self {
            Handler::Command(_) => HandlerVariant::Command,
            Handler::Component(_) => HandlerVariant::Component,
            Handler::Event(_) => HandlerVariant::Event,
        }
    }
}

/// Registry slot contents: one exclusively owned handler instance plus its
/// instantiation stamp. `created_at` anchors the hot-reload debounce
/// window; replacing a slot swaps the whole wrapper and drops the previous
/// instance.
pub struct Loaded<T: ?Sized> {
    pub handler: Arc<T>,
    pub created_at: Instant,
}

impl<T: ?Sized> Loaded<T> {
    pub fn new(handler: Arc<T>) -> Self {
        Loaded {
            handler,
            created_at: Instant::now(),
        }
    }
}

impl<T: ?Sized> Clone for Loaded<T> {
    fn clone(&self) -> Self {
        Loaded {
            handler: Arc::clone(&self.handler),
            created_at: self.created_at,
        }
    }
}

pub type LoadedCommand<D> = Loaded<dyn CommandHandler<D>>;
pub type LoadedComponent<D> = Loaded<dyn ComponentHandler<D>>;
pub type LoadedEvent<D> = Loaded<dyn EventHandler<D>>;
