pub mod accessor;
pub mod collection;
pub mod constructor;
pub mod converters;
pub mod field;
pub mod field_value;
pub mod metadata;

pub use accessor::{AnyBox, CollectionAccessor, ObjectAccessor, ValueAccessor};
pub use collection::{
    CollectionKind, CollectionSupplier, CollectionSuppliers, DequeSupplier, EmbeddableCollection,
    ErasedCollection, ListSupplier, SetSupplier, StagedCollection, TreeSetSupplier,
};
pub use constructor::{
    ConstructorArgs, ConstructorBuilder, ConstructorDescriptor, ConstructorEvent,
    ConstructorListener,
};
pub use converters::{AttributeConverter, ConverterRef, Converters};
pub use field::{FieldAccessor, FieldMapping, MappingType};
pub use field_value::FieldValue;
pub use metadata::{EntitiesMetadata, EntityMetadata, EntityMetadataBuilder, InstanceStrategy, Mapped};
