use std::future::Future;
use std::sync::Arc;

use tracing::{Instrument, Level, event, info_span};

use super::events::EventPersistManager;
use super::validation::{Validator, ValidatorFactory, validate_entity};
use crate::converter::{EntityConverter, KeyValueEntityConverter, RecordConverter};
use crate::core::{MappingError, Result};
use crate::mapping::{EntityMetadata, Mapped};

/// Save/update pipeline for one storage family:
/// validate, pre-event, convert, storage action, convert back, post-event.
///
/// Holds no per-call state, so one instance can serve concurrent calls.
pub struct Workflow<C> {
    converter: C,
    events: Arc<EventPersistManager>,
    validator: Arc<dyn Validator>,
}

pub type DocumentWorkflow = Workflow<EntityConverter>;
pub type ColumnWorkflow = Workflow<EntityConverter>;
pub type KeyValueWorkflow = Workflow<KeyValueEntityConverter>;

impl<C: RecordConverter> Workflow<C> {
    /// Uses the process-wide validator and no observers.
    pub fn new(converter: C) -> Result<Self> {
        Ok(Self::from_parts(
            converter,
            Arc::new(EventPersistManager::new()),
            ValidatorFactory::validator()?,
        ))
    }

    pub fn from_parts(
        converter: C,
        events: Arc<EventPersistManager>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            converter,
            events,
            validator,
        }
    }

    pub fn with_events(mut self, events: Arc<EventPersistManager>) -> Self {
        self.events = events;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn events(&self) -> &Arc<EventPersistManager> {
        &self.events
    }

    /// Runs the pipeline around `action`.
    ///
    /// `action` receives the converted record and returns the stored one.
    /// Its errors come back unchanged; the workflow's own errors are turned
    /// into `E` through `From<MappingError>`.
    pub fn flow<T, E, F>(&self, entity: impl Into<Option<T>>, action: F) -> std::result::Result<T, E>
    where
        T: Mapped,
        E: From<MappingError>,
        F: FnOnce(C::Record) -> std::result::Result<C::Record, E>,
    {
        let mut entity = entity
            .into()
            .ok_or_else(|| MappingError::null_argument("entity"))?;
        let metadata = T::metadata()?;

        let span = info_span!("workflow.flow", entity = metadata.name());
        let _enter = span.enter();

        let record = self.prepare(&mut entity, &metadata)?;

        event!(Level::DEBUG, "storage action");
        let stored = action(record)?;

        Ok(self.complete(stored, &metadata)?)
    }

    /// [`Workflow::flow`] with an asynchronous storage action, awaited inline.
    pub async fn flow_async<T, E, F, Fut>(
        &self,
        entity: impl Into<Option<T>>,
        action: F,
    ) -> std::result::Result<T, E>
    where
        T: Mapped,
        E: From<MappingError>,
        F: FnOnce(C::Record) -> Fut,
        Fut: Future<Output = std::result::Result<C::Record, E>>,
    {
        let mut entity = entity
            .into()
            .ok_or_else(|| MappingError::null_argument("entity"))?;
        let metadata = T::metadata()?;

        let span = info_span!("workflow.flow", entity = metadata.name(), mode = "async");
        let record = span.in_scope(|| self.prepare(&mut entity, &metadata))?;

        let stored = action(record).instrument(span.clone()).await?;

        Ok(span.in_scope(|| self.complete(stored, &metadata))?)
    }

    fn prepare<T: Mapped>(&self, entity: &mut T, metadata: &EntityMetadata) -> Result<C::Record> {
        event!(Level::DEBUG, "validate");
        if let Err(err) = validate_entity(self.validator.as_ref(), &*entity, metadata.type_name()) {
            event!(Level::WARN, error = %err, "validation failed");
            return Err(err);
        }

        self.events.fire_pre_entity(entity, metadata);

        event!(Level::DEBUG, "convert to record");
        self.converter.to_record(entity)
    }

    fn complete<T: Mapped>(&self, stored: C::Record, metadata: &EntityMetadata) -> Result<T> {
        event!(Level::DEBUG, "convert from record");
        let entity: T = self.converter.to_entity(stored)?;

        self.events.fire_post_entity(&entity, metadata);
        Ok(entity)
    }
}

impl<C: Clone> Clone for Workflow<C> {
    fn clone(&self) -> Self {
        Self {
            converter: self.converter.clone(),
            events: Arc::clone(&self.events),
            validator: Arc::clone(&self.validator),
        }
    }
}
