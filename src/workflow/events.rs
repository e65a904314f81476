use std::any::Any;
use std::sync::Arc;

use tracing::{Level, event};

use crate::mapping::{ConstructorEvent, ConstructorListener, EntityMetadata};

/// Lifecycle callbacks invoked by the workflow. All methods default to no-ops.
pub trait EntityObserver: Send + Sync {
    /// Before conversion; the entity may still be changed.
    fn pre_entity(&self, _entity: &mut dyn Any, _metadata: &EntityMetadata) {}

    /// After the entity was rebuilt from the stored record.
    fn post_entity(&self, _entity: &dyn Any, _metadata: &EntityMetadata) {}

    fn on_constructor(&self, _event: &ConstructorEvent) {}
}

/// Fans lifecycle events out to the configured observers, in
/// registration order.
#[derive(Default, Clone)]
pub struct EventPersistManager {
    observers: Vec<Arc<dyn EntityObserver>>,
}

impl EventPersistManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn EntityObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn register(&mut self, observer: Arc<dyn EntityObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn fire_pre_entity(&self, entity: &mut dyn Any, metadata: &EntityMetadata) {
        event!(Level::DEBUG, entity = metadata.name(), observers = self.observers.len(), "pre entity");
        for observer in &self.observers {
            observer.pre_entity(entity, metadata);
        }
    }

    pub fn fire_post_entity(&self, entity: &dyn Any, metadata: &EntityMetadata) {
        event!(Level::DEBUG, entity = metadata.name(), observers = self.observers.len(), "post entity");
        for observer in &self.observers {
            observer.post_entity(entity, metadata);
        }
    }
}

impl ConstructorListener for EventPersistManager {
    fn on_constructor(&self, event: &ConstructorEvent) {
        for observer in &self.observers {
            observer.on_constructor(event);
        }
    }
}
