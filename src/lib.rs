// ============================================================================
// recordmap Library
// ============================================================================
//
// Maps plain Rust structs to schema-less records and back, for document,
// column and key-value stores.

extern crate self as recordmap;

pub mod config;
pub mod converter;
pub mod core;
pub mod facade;
pub mod mapping;
pub mod repository;
pub mod template;
pub mod workflow;

// Re-export main types for convenience
pub use crate::config::{MapperConfig, Settings};
pub use crate::converter::{EntityConverter, KeyValueEntity, KeyValueEntityConverter, RecordConverter};
pub use crate::core::{MappingError, Record, RecordField, Result, Value};
pub use crate::facade::{Mapper, MapperBuilder};
pub use crate::mapping::{
    AttributeConverter, CollectionKind, EntitiesMetadata, EntityMetadata, FieldMapping, Mapped,
    MappingType,
};
pub use crate::repository::{
    DynamicReturn, MethodDescriptor, Page, Pageable, RepositoryReturn, ReturnShape, Sort,
};
pub use crate::template::{DocumentTemplate, InMemoryDocumentManager};
pub use crate::workflow::{
    ColumnWorkflow, ConstraintViolation, DocumentWorkflow, EntityObserver, KeyValueWorkflow,
    RuleValidator, Validator, ValidatorFactory, Workflow,
};

// Derive macros
pub use recordmap_derive::{Embeddable, Entity};
