use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::event::{Event, EventHandler, EventId, EventResult};

/// Synchronous event dispatcher.
///
/// Observers registered by name run first, in registration order, followed by
/// observers registered for the concrete event type. Any observer returning
/// [`EventResult::Stop`] ends propagation.
pub struct EventDispatcher {
    handlers: HashMap<String, Vec<(EventId, EventHandler)>>,
    type_handlers: HashMap<TypeId, Vec<(EventId, EventHandler)>>,
    next_handler_id: EventId,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_handler_count: usize = self.handlers.values().map(|v| v.len()).sum();
        let type_handler_count: usize = self.type_handlers.values().map(|v| v.len()).sum();
        f.debug_struct("EventDispatcher")
            .field("name_handlers_count", &name_handler_count)
            .field("type_handlers_count", &type_handler_count)
            .field("next_handler_id", &self.next_handler_id)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            type_handlers: HashMap::new(),
            next_handler_id: 1,
        }
    }

    pub fn register_handler(&mut self, event_name: &str, handler: EventHandler) -> EventId {
        let id = self.next_id();
        self.handlers
            .entry(event_name.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    pub fn register_type_handler<E: Event + 'static>(&mut self, handler: EventHandler) -> EventId {
        let id = self.next_id();
        self.type_handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, handler));
        id
    }

    pub fn unregister_handler(&mut self, id: EventId) -> bool {
        let mut found = false;
        for handlers in self.handlers.values_mut().chain(self.type_handlers.values_mut()) {
            let len_before = handlers.len();
            handlers.retain(|(h_id, _)| *h_id != id);
            if handlers.len() < len_before {
                found = true;
            }
        }
        found
    }

    pub fn has_listeners(&self, event_name: &str) -> bool {
        self.handlers
            .get(event_name)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    pub fn dispatch(&self, event: &dyn Event) -> EventResult {
        let by_name = self.handlers.get(event.name()).into_iter().flatten();
        let by_type = self
            .type_handlers
            .get(&event.as_any().type_id())
            .into_iter()
            .flatten();

        for (_, handler) in by_name.chain(by_type) {
            if handler(event) == EventResult::Stop {
                return EventResult::Stop;
            }
        }
        EventResult::Continue
    }

    fn next_id(&mut self) -> EventId {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        id
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to create a handler that only fires for events of type `E`
pub fn sync_typed_handler<E, F>(f: F) -> EventHandler
where
    E: Event + 'static,
    F: Fn(&E) -> EventResult + Send + Sync + 'static,
{
    Box::new(move |event: &dyn Event| match event.as_any().downcast_ref::<E>() {
        Some(e) => f(e),
        None => EventResult::Continue,
    })
}
