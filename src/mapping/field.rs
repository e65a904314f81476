use std::any::{Any, type_name};
use std::fmt;

use super::accessor::{
    AnyBox, CollectionAccessor, CollectionField, ObjectAccessor, ObjectField, ValueAccessor,
    ValueField,
};
use super::collection::EmbeddableCollection;
use super::converters::{AttributeConverter, ConverterRef};
use super::field_value::FieldValue;
use super::metadata::Mapped;
use crate::core::Result;

/// How a field takes part in conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingType {
    Default,
    Embedded,
    Entity,
    Collection,
}

pub enum FieldAccessor {
    Value {
        accessor: Box<dyn ValueAccessor>,
        /// Plain collection of scalars (`Vec<String>`, ...).
        collection: bool,
    },
    Object {
        accessor: Box<dyn ObjectAccessor>,
        embeddable: bool,
    },
    Collection(Box<dyn CollectionAccessor>),
}

/// One declared field of a mapped type.
pub struct FieldMapping {
    field: &'static str,
    name: &'static str,
    type_name: &'static str,
    id: bool,
    converter: Option<ConverterRef>,
    accessor: FieldAccessor,
}

impl FieldMapping {
    /// A scalar field. The getter returns `None` for an absent value.
    pub fn value<T: Mapped, F: FieldValue>(
        field: &'static str,
        get: fn(&T) -> Option<&F>,
        set: fn(&mut T, F),
    ) -> Self {
        Self::with_accessor(
            field,
            type_name::<F>(),
            FieldAccessor::Value {
                accessor: Box::new(ValueField {
                    name: field,
                    get,
                    set,
                }),
                collection: F::COLLECTION,
            },
        )
    }

    /// A field holding another mapped type; EMBEDDED or ENTITY depending on
    /// whether the target is embeddable.
    pub fn object<T: Mapped, O: Mapped>(
        field: &'static str,
        get: fn(&T) -> Option<&O>,
        set: fn(&mut T, O),
    ) -> Self {
        Self::with_accessor(
            field,
            type_name::<O>(),
            FieldAccessor::Object {
                accessor: Box::new(ObjectField {
                    name: field,
                    get,
                    set,
                }),
                embeddable: O::EMBEDDABLE,
            },
        )
    }

    pub fn collection<T: Mapped, C: EmbeddableCollection>(
        field: &'static str,
        get: fn(&T) -> Option<&C>,
        set: fn(&mut T, C),
    ) -> Self {
        Self::with_accessor(
            field,
            type_name::<C>(),
            FieldAccessor::Collection(Box::new(CollectionField {
                name: field,
                get,
                set,
            })),
        )
    }

    fn with_accessor(field: &'static str, type_name: &'static str, accessor: FieldAccessor) -> Self {
        Self {
            field,
            name: field,
            type_name,
            id: false,
            converter: None,
            accessor,
        }
    }

    /// Stores the field under a different record name.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    pub fn converter<C: AttributeConverter + Default>(mut self) -> Self {
        self.converter = Some(ConverterRef::of::<C>());
        self
    }

    /// Name of the struct field.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Name used in records.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_id(&self) -> bool {
        self.id
    }

    pub fn converter_ref(&self) -> Option<&ConverterRef> {
        self.converter.as_ref()
    }

    pub fn accessor(&self) -> &FieldAccessor {
        &self.accessor
    }

    pub fn mapping_type(&self) -> MappingType {
        match &self.accessor {
            FieldAccessor::Value {
                collection: false, ..
            } => MappingType::Default,
            FieldAccessor::Value {
                collection: true, ..
            } => MappingType::Collection,
            FieldAccessor::Object {
                embeddable: true, ..
            } => MappingType::Embedded,
            FieldAccessor::Object {
                embeddable: false, ..
            } => MappingType::Entity,
            FieldAccessor::Collection(_) => MappingType::Collection,
        }
    }

    /// `true` only for collections whose elements are mapped types.
    pub fn is_embeddable(&self) -> bool {
        matches!(self.accessor, FieldAccessor::Collection(_))
    }

    pub fn is_null(&self, entity: &dyn Any) -> bool {
        match &self.accessor {
            FieldAccessor::Value { accessor, .. } => accessor.read(entity).is_none(),
            FieldAccessor::Object { accessor, .. } => accessor.read(entity).is_none(),
            FieldAccessor::Collection(accessor) => accessor.read(entity).is_none(),
        }
    }

    /// Writes an already-typed value through the field's setter.
    pub fn write(&self, entity: &mut dyn Any, value: AnyBox) -> Result<()> {
        match &self.accessor {
            FieldAccessor::Value { accessor, .. } => accessor.write(entity, value),
            FieldAccessor::Object { accessor, .. } => accessor.write(entity, value),
            FieldAccessor::Collection(accessor) => accessor.write(entity, value),
        }
    }
}

impl fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapping")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("mapping_type", &self.mapping_type())
            .field("id", &self.id)
            .field("converter", &self.converter)
            .finish()
    }
}
