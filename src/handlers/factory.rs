//! Handler constructors.
//!
//! Unit definition files name the constructor to invoke; constructors are
//! registered here by the bootstrap collaborator before any directory is
//! loaded.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::warn;

use crate::handlers::Handler;

/// Everything a constructor gets to build its handler: the shared
/// application state and the free-form parameters of the unit definition.
pub struct FactoryContext<'a, D> {
    pub data: &'a Arc<D>,
    pub params: &'a serde_yaml::Value,
    /// Path of the unit definition being loaded.
    pub path: &'a Path,
}

/// A registered handler constructor. Builds exactly one handler instance
/// per invocation; a returned error aborts only the unit being loaded.
pub trait HandlerFactory<D>: Send + Sync {
    fn build(&self, ctx: &FactoryContext<'_, D>) -> anyhow::Result<Handler<D>>;
}

impl<D, F> HandlerFactory<D> for F
where
    F: Fn(&FactoryContext<'_, D>) -> anyhow::Result<Handler<D>> + Send + Sync,
{
    fn build(&self, ctx: &FactoryContext<'_, D>) -> anyhow::Result<Handler<D>> {
        self(ctx)
    }
}

/// Constructor table consulted by the loader.
pub struct FactoryRegistry<D> {
    factories: HashMap<String, Arc<dyn HandlerFactory<D>>>,
}

impl<D> Default for FactoryRegistry<D> {
    fn default() -> Self {
        FactoryRegistry {
            factories: HashMap::new(),
        }
    }
}

impl<D> FactoryRegistry<D> {
    pub fn new() -> Self {
        FactoryRegistry::default()
    }

    /// Register a constructor under its exported name. Re-registering a
    /// name replaces the earlier constructor.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl HandlerFactory<D> + 'static,
    ) {
        let name = name.into();
        if self
            .factories
            .insert(name.clone(), Arc::new(factory))
            .is_some()
        {
            warn!("constructor {name:?} registered twice; keeping the later one");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn HandlerFactory<D>>> {
        self.factories.get(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::event::{EventHandler, EventType, GatewayEvent};
    use async_trait::async_trait;

    struct NoopEvent;

    #[async_trait]
    impl EventHandler<()> for NoopEvent {
        fn event_type(&self) -> EventType {
            EventType::Ready
        }

        async fn handle(&self, _data: &(), _event: &GatewayEvent) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn noop_factory(_ctx: &FactoryContext<'_, ()>) -> anyhow::Result<Handler<()>> {
        Ok(Handler::Event(Arc::new(NoopEvent)))
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = FactoryRegistry::<()>::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = FactoryRegistry::new();
        registry.register("noop", noop_factory);

        assert_eq!(registry.len(), 1);
        assert!(registry.get("noop").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_reregistering_replaces() {
        let mut registry = FactoryRegistry::new();
        registry.register("noop", noop_factory);
        registry.register("noop", noop_factory);

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_factory_builds_handler() {
        let mut registry = FactoryRegistry::new();
        registry.register("noop", noop_factory);

        let data = Arc::new(());
        let params = serde_yaml::Value::Null;
        let ctx = FactoryContext {
            data: &data,
            params: &params,
            path: Path::new("units/events/noop.yaml"),
        };
        let handler = registry.get("noop").unwrap().build(&ctx).unwrap();
        assert_eq!(handler.variant(), crate::handlers::HandlerVariant::Event);
    }
}
