// ============================================================================
// Mapper facade
// ============================================================================
//
// Wires the converter registries, collection suppliers, entity observers and
// validator together once and hands out workflows and templates that share
// them.

use std::sync::Arc;

use tracing::info;

use crate::config::MapperConfig;
use crate::converter::{EntityConverter, KeyValueEntityConverter, RecordConverter};
use crate::core::{MappingError, Result};
use crate::mapping::{
    AttributeConverter, CollectionSupplier, CollectionSuppliers, ConstructorListener, Converters,
};
use crate::template::{DocumentTemplate, InMemoryDocumentManager};
use crate::workflow::{
    ColumnWorkflow, DocumentWorkflow, EntityObserver, EventPersistManager, KeyValueWorkflow,
    Validator, ValidatorFactory, Workflow,
};

/// Entry point for mapping entities to records.
///
/// ```
/// use recordmap::{Mapper, MapperConfig};
///
/// let mapper = Mapper::new(MapperConfig::default()).unwrap();
/// assert_eq!(mapper.config().provider, "memory");
/// assert!(mapper.converter().strict_embedded_nulls());
/// ```
pub struct Mapper {
    config: MapperConfig,
    converter: EntityConverter,
    events: Arc<EventPersistManager>,
    validator: Arc<dyn Validator>,
}

impl Mapper {
    /// Create a mapper with the default converters, suppliers and the
    /// validator installed in [`ValidatorFactory`]
    pub fn new(config: MapperConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: MapperConfig) -> MapperBuilder {
        MapperBuilder::new(config)
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Converter sharing this mapper's registries and observers
    pub fn converter(&self) -> &EntityConverter {
        &self.converter
    }

    pub fn key_value_converter(&self) -> KeyValueEntityConverter {
        KeyValueEntityConverter::new(self.converter.clone())
    }

    pub fn events(&self) -> &Arc<EventPersistManager> {
        &self.events
    }

    pub fn validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }

    pub fn document_workflow(&self) -> DocumentWorkflow {
        self.workflow(self.converter.clone())
    }

    pub fn column_workflow(&self) -> ColumnWorkflow {
        self.workflow(self.converter.clone())
    }

    pub fn key_value_workflow(&self) -> KeyValueWorkflow {
        self.workflow(self.key_value_converter())
    }

    pub fn document_template<M>(&self, manager: Arc<M>) -> DocumentTemplate<M> {
        DocumentTemplate::new(self.document_workflow(), manager)
    }

    /// Template over an in-memory manager configured from the provider
    /// settings
    pub fn memory_template(&self) -> Result<DocumentTemplate<InMemoryDocumentManager>> {
        if self.config.provider != "memory" {
            return Err(MappingError::InvalidArgument(format!(
                "provider '{}' has no in-memory document manager",
                self.config.provider
            )));
        }
        let manager = InMemoryDocumentManager::from_settings(&self.config.settings)?;
        Ok(self.document_template(Arc::new(manager)))
    }

    fn workflow<C: RecordConverter>(&self, converter: C) -> Workflow<C> {
        Workflow::from_parts(converter, Arc::clone(&self.events), Arc::clone(&self.validator))
    }
}

/// Builder for [`Mapper`]
pub struct MapperBuilder {
    config: MapperConfig,
    converters: Converters,
    suppliers: CollectionSuppliers,
    events: EventPersistManager,
    validator: Option<Arc<dyn Validator>>,
}

impl MapperBuilder {
    pub fn new(config: MapperConfig) -> Self {
        Self {
            config,
            converters: Converters::new(),
            suppliers: CollectionSuppliers::with_defaults(),
            events: EventPersistManager::new(),
            validator: None,
        }
    }

    /// Register a configured attribute converter instance
    pub fn converter<C: AttributeConverter>(self, converter: C) -> Result<Self> {
        self.converters.register(converter)?;
        Ok(self)
    }

    /// Register an additional collection supplier; it takes precedence over
    /// earlier suppliers for the kinds it accepts
    pub fn supplier(mut self, supplier: Box<dyn CollectionSupplier>) -> Self {
        self.suppliers.register(supplier);
        self
    }

    /// Register an entity observer
    pub fn observer(mut self, observer: Arc<dyn EntityObserver>) -> Self {
        self.events.register(observer);
        self
    }

    /// Set the validator, overriding the process-wide one
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Result<Mapper> {
        let validator = match self.validator {
            Some(validator) => validator,
            None => ValidatorFactory::validator()?,
        };
        let events = Arc::new(self.events);
        let listener = Arc::clone(&events) as Arc<dyn ConstructorListener>;
        let converter = EntityConverter::new()
            .with_converters(Arc::new(self.converters))
            .with_suppliers(Arc::new(self.suppliers))
            .with_listener(listener)
            .with_strict_embedded_nulls(self.config.strict_embedded_nulls);

        info!(
            name = %self.config.name,
            provider = %self.config.provider,
            observers = events.len(),
            "mapper created"
        );

        Ok(Mapper {
            config: self.config,
            converter,
            events,
            validator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Record;
    use crate::workflow::NoopValidator;

    #[test]
    fn test_workflows_share_events() {
        struct Quiet;
        impl EntityObserver for Quiet {}

        let mapper = Mapper::builder(MapperConfig::default())
            .observer(Arc::new(Quiet))
            .validator(Arc::new(NoopValidator))
            .build()
            .unwrap();

        assert_eq!(mapper.events().len(), 1);
        assert!(Arc::ptr_eq(mapper.document_workflow().events(), mapper.events()));
        assert!(Arc::ptr_eq(mapper.key_value_workflow().events(), mapper.events()));
        assert_eq!(mapper.converter().suppliers().list_suppliers().len(), 4);
    }

    #[test]
    fn test_strict_flag_follows_config() {
        let mapper = Mapper::new(MapperConfig::default().strict_embedded_nulls(false)).unwrap();
        assert!(!mapper.converter().strict_embedded_nulls());
        assert!(!mapper.document_workflow().converter().strict_embedded_nulls());
    }

    #[test]
    fn test_memory_template_requires_memory_provider() {
        let mapper = Mapper::new(MapperConfig::new("mongodb")).unwrap();
        assert!(matches!(
            mapper.memory_template(),
            Err(MappingError::InvalidArgument(_))
        ));

        let mapper = Mapper::new(MapperConfig::default().setting("id.start", "7")).unwrap();
        let template = mapper.memory_template().unwrap();
        let stored = crate::template::DocumentManager::insert(
            template.manager().as_ref(),
            Record::new("Thing"),
        )
        .unwrap();
        assert_eq!(stored.get("id"), Some(&crate::core::Value::Integer(7)));
    }
}
