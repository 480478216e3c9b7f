//! Event handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};

use crate::handlers::event::EventType;
use crate::handlers::LoadedEvent;
use crate::platform::stream::EventStream;

/// Active event subscriptions, keyed by event type. At most one live
/// subscription per event type at any time.
pub struct EventRegistry<D> {
    active: HashMap<EventType, LoadedEvent<D>>,
}

impl<D> Default for EventRegistry<D> {
    fn default() -> Self {
        EventRegistry {
            active: HashMap::new(),
        }
    }
}

impl<D> EventRegistry<D> {
    pub fn new() -> Self {
        EventRegistry::default()
    }

    /// Unsubscribe every current binding, clear the registry, then
    /// subscribe each incoming handler.
    pub fn populate(&mut self, units: Vec<LoadedEvent<D>>, stream: &dyn EventStream<D>) {
        for &event_type in self.active.keys() {
            stream.unsubscribe_all(event_type);
        }
        self.active.clear();

        for unit in units {
            let event_type = unit.handler.event_type();
            if self.active.contains_key(&event_type) {
                warn!("duplicate handler for {event_type}; keeping the later one");
                stream.unsubscribe_all(event_type);
            }
            stream.subscribe(
                event_type,
                unit.handler.one_time(),
                Arc::clone(&unit.handler),
            );
            info!("event handler for {event_type} started");
            self.active.insert(event_type, unit);
        }
    }

    /// Hot-reload replacement: unsubscribe the previous binding for the
    /// event type before subscribing the new handler.
    pub fn apply_update(&mut self, unit: LoadedEvent<D>, stream: &dyn EventStream<D>) {
        let event_type = unit.handler.event_type();
        if self.active.remove(&event_type).is_some() {
            stream.unsubscribe_all(event_type);
        }
        stream.subscribe(
            event_type,
            unit.handler.one_time(),
            Arc::clone(&unit.handler),
        );
        info!("event handler for {event_type} reloaded");
        self.active.insert(event_type, unit);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::event::{EventHandler, GatewayEvent};
    use crate::handlers::Loaded;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockEvent {
        event_type: EventType,
    }

    #[async_trait]
    impl EventHandler<()> for MockEvent {
        fn event_type(&self) -> EventType {
            self.event_type
        }

        async fn handle(&self, _data: &(), _event: &GatewayEvent) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn unit(event_type: EventType) -> LoadedEvent<()> {
        Loaded::new(Arc::new(MockEvent { event_type }))
    }

    #[derive(Debug, PartialEq)]
    enum StreamCall {
        Subscribe(EventType),
        UnsubscribeAll(EventType),
    }

    #[derive(Default)]
    struct MockStream {
        calls: Mutex<Vec<StreamCall>>,
    }

    impl EventStream<()> for MockStream {
        fn subscribe(
            &self,
            event_type: EventType,
            _one_time: bool,
            _handler: Arc<dyn EventHandler<()>>,
        ) {
            self.calls
                .lock()
                .unwrap()
                .push(StreamCall::Subscribe(event_type));
        }

        fn unsubscribe_all(&self, event_type: EventType) {
            self.calls
                .lock()
                .unwrap()
                .push(StreamCall::UnsubscribeAll(event_type));
        }
    }

    #[test]
    fn test_populate_subscribes_each_handler() {
        let mut registry = EventRegistry::new();
        let stream = MockStream::default();
        registry.populate(
            vec![unit(EventType::GuildCreate), unit(EventType::MessageCreate)],
            &stream,
        );

        assert_eq!(registry.len(), 2);
        let calls = stream.calls.lock().unwrap();
        assert!(calls.contains(&StreamCall::Subscribe(EventType::GuildCreate)));
        assert!(calls.contains(&StreamCall::Subscribe(EventType::MessageCreate)));
    }

    #[test]
    fn test_repopulate_unsubscribes_previous_bindings() {
        let mut registry = EventRegistry::new();
        let stream = MockStream::default();
        registry.populate(vec![unit(EventType::GuildCreate)], &stream);
        registry.populate(vec![unit(EventType::MessageCreate)], &stream);

        assert_eq!(registry.len(), 1);
        let calls = stream.calls.lock().unwrap();
        assert!(calls.contains(&StreamCall::UnsubscribeAll(EventType::GuildCreate)));
    }

    #[test]
    fn test_apply_update_replaces_binding() {
        let mut registry = EventRegistry::new();
        let stream = MockStream::default();
        registry.populate(vec![unit(EventType::GuildCreate)], &stream);
        registry.apply_update(unit(EventType::GuildCreate), &stream);

        assert_eq!(registry.len(), 1);
        let calls = stream.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                StreamCall::Subscribe(EventType::GuildCreate),
                StreamCall::UnsubscribeAll(EventType::GuildCreate),
                StreamCall::Subscribe(EventType::GuildCreate),
            ]
        );
    }

    #[test]
    fn test_apply_update_for_new_event_type_subscribes_only() {
        let mut registry = EventRegistry::new();
        let stream = MockStream::default();
        registry.apply_update(unit(EventType::Ready), &stream);

        let calls = stream.calls.lock().unwrap();
        assert_eq!(*calls, vec![StreamCall::Subscribe(EventType::Ready)]);
    }
}
