//! Platform event stream port and its in-process implementation.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, error};

use crate::handlers::event::{EventHandler, EventType, GatewayEvent};

/// Event stream port: at most one live binding per event type.
pub trait EventStream<D>: Send + Sync {
    fn subscribe(&self, event_type: EventType, one_time: bool, handler: Arc<dyn EventHandler<D>>);

    fn unsubscribe_all(&self, event_type: EventType);
}

struct Binding<D> {
    handler: Arc<dyn EventHandler<D>>,
    one_time: bool,
}

/// In-process event stream the gateway adapter drains into.
pub struct GatewayEvents<D> {
    bindings: DashMap<EventType, Binding<D>>,
}

impl<D> Default for GatewayEvents<D> {
    fn default() -> Self {
        GatewayEvents {
            bindings: DashMap::new(),
        }
    }
}

impl<D> GatewayEvents<D> {
    pub fn new() -> Self {
        GatewayEvents::default()
    }

    /// Whether an event type currently has a live binding.
    pub fn is_subscribed(&self, event_type: EventType) -> bool {
        self.bindings.contains_key(&event_type)
    }
}

impl<D: Send + Sync> EventStream<D> for GatewayEvents<D> {
    fn subscribe(&self, event_type: EventType, one_time: bool, handler: Arc<dyn EventHandler<D>>) {
        self.bindings.insert(event_type, Binding { handler, one_time });
    }

    fn unsubscribe_all(&self, event_type: EventType) {
        self.bindings.remove(&event_type);
    }
}

impl<D: Send + Sync> GatewayEvents<D> {
    /// Deliver one gateway event to its subscribed handler. One-shot
    /// bindings are removed before the handler runs.
    pub async fn dispatch(&self, data: &D, event: &GatewayEvent) {
        let event_type = event.event_type();
        let handler = {
            let Some(binding) = self.bindings.get(&event_type) else {
                return;
            };
            let handler = Arc::clone(&binding.handler);
            let one_time = binding.one_time;
            drop(binding);
            if one_time {
                self.bindings.remove(&event_type);
            }
            handler
        };

        debug!("delivering {event_type} event");
        if let Err(e) = handler.handle(data, event).await {
            error!("event handler for {event_type} failed: {e}");
        }
    }
}
