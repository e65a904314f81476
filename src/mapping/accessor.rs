//! Type-erased read/write access to one declared field.
//!
//! Each accessor is built from a pair of plain `fn` pointers supplied at
//! registration time (by hand or by `#[derive(Entity)]`), so reading and
//! writing never goes through anything slower than a downcast.

use std::any::{Any, type_name};
use std::sync::Arc;

use super::collection::{CollectionKind, EmbeddableCollection, ErasedCollection};
use super::field_value::FieldValue;
use super::metadata::{EntityMetadata, Mapped};
use crate::core::{MappingError, Result, Value};

/// An owned, type-erased value: an entity, a field value or a collection.
pub type AnyBox = Box<dyn Any + Send>;

pub(crate) fn downcast_entity<'a, T: 'static>(entity: &'a dyn Any) -> Option<&'a T> {
    entity.downcast_ref::<T>()
}

pub(crate) fn downcast_entity_mut<T: 'static>(entity: &mut dyn Any) -> Result<&mut T> {
    entity.downcast_mut::<T>().ok_or_else(|| {
        MappingError::TypeMismatch(format!("target instance is not a {}", type_name::<T>()))
    })
}

pub(crate) fn downcast_box<X: 'static>(value: AnyBox, field: &str) -> Result<X> {
    value.downcast::<X>().map(|boxed| *boxed).map_err(|_| {
        MappingError::TypeMismatch(format!(
            "value for field '{}' is not a {}",
            field,
            type_name::<X>()
        ))
    })
}

/// Access to a DEFAULT (scalar) field.
pub trait ValueAccessor: Send + Sync {
    fn read(&self, entity: &dyn Any) -> Option<Value>;

    /// Turns a record value into the field's own type, boxed.
    fn decode(&self, value: Value) -> Result<AnyBox>;

    fn write(&self, entity: &mut dyn Any, value: AnyBox) -> Result<()>;
}

/// Access to an EMBEDDED or ENTITY field.
pub trait ObjectAccessor: Send + Sync {
    fn read<'a>(&self, entity: &'a dyn Any) -> Option<&'a dyn Any>;

    fn write(&self, entity: &mut dyn Any, value: AnyBox) -> Result<()>;

    fn target(&self) -> Result<Arc<EntityMetadata>>;
}

/// Access to a COLLECTION field whose elements are mapped types.
pub trait CollectionAccessor: Send + Sync {
    fn read<'a>(&self, entity: &'a dyn Any) -> Option<Vec<&'a dyn Any>>;

    /// Moves the staged elements into the declared collection type.
    fn assemble(&self, elements: Box<dyn ErasedCollection>) -> Result<AnyBox>;

    fn write(&self, entity: &mut dyn Any, value: AnyBox) -> Result<()>;

    fn element(&self) -> Result<Arc<EntityMetadata>>;

    fn kind(&self) -> CollectionKind;
}

pub(crate) struct ValueField<T, F> {
    pub(crate) name: &'static str,
    pub(crate) get: fn(&T) -> Option<&F>,
    pub(crate) set: fn(&mut T, F),
}

impl<T: Mapped, F: FieldValue> ValueAccessor for ValueField<T, F> {
    fn read(&self, entity: &dyn Any) -> Option<Value> {
        downcast_entity::<T>(entity)
            .and_then(|e| (self.get)(e))
            .map(FieldValue::to_value)
    }

    fn decode(&self, value: Value) -> Result<AnyBox> {
        let decoded = F::from_value(value).map_err(|err| {
            MappingError::TypeMismatch(format!("field '{}': {}", self.name, err))
        })?;
        Ok(Box::new(decoded))
    }

    fn write(&self, entity: &mut dyn Any, value: AnyBox) -> Result<()> {
        let value = downcast_box::<F>(value, self.name)?;
        let target = downcast_entity_mut::<T>(entity)?;
        (self.set)(target, value);
        Ok(())
    }
}

pub(crate) struct ObjectField<T, O> {
    pub(crate) name: &'static str,
    pub(crate) get: fn(&T) -> Option<&O>,
    pub(crate) set: fn(&mut T, O),
}

impl<T: Mapped, O: Mapped> ObjectAccessor for ObjectField<T, O> {
    fn read<'a>(&self, entity: &'a dyn Any) -> Option<&'a dyn Any> {
        let object: &'a O = downcast_entity::<T>(entity).and_then(|e| (self.get)(e))?;
        Some(object)
    }

    fn write(&self, entity: &mut dyn Any, value: AnyBox) -> Result<()> {
        let value = downcast_box::<O>(value, self.name)?;
        let target = downcast_entity_mut::<T>(entity)?;
        (self.set)(target, value);
        Ok(())
    }

    fn target(&self) -> Result<Arc<EntityMetadata>> {
        O::metadata()
    }
}

pub(crate) struct CollectionField<T, C> {
    pub(crate) name: &'static str,
    pub(crate) get: fn(&T) -> Option<&C>,
    pub(crate) set: fn(&mut T, C),
}

impl<T: Mapped, C: EmbeddableCollection> CollectionAccessor for CollectionField<T, C> {
    fn read<'a>(&self, entity: &'a dyn Any) -> Option<Vec<&'a dyn Any>> {
        let collection: &'a C = downcast_entity::<T>(entity).and_then(|e| (self.get)(e))?;
        Some(
            collection
                .elements()
                .into_iter()
                .map(|element| element as &dyn Any)
                .collect(),
        )
    }

    fn assemble(&self, elements: Box<dyn ErasedCollection>) -> Result<AnyBox> {
        let mut collection = C::default();
        for element in elements.into_elements() {
            collection.append(downcast_box::<C::Element>(element, self.name)?);
        }
        Ok(Box::new(collection))
    }

    fn write(&self, entity: &mut dyn Any, value: AnyBox) -> Result<()> {
        let value = downcast_box::<C>(value, self.name)?;
        let target = downcast_entity_mut::<T>(entity)?;
        (self.set)(target, value);
        Ok(())
    }

    fn element(&self) -> Result<Arc<EntityMetadata>> {
        <C::Element as Mapped>::metadata()
    }

    fn kind(&self) -> CollectionKind {
        C::KIND
    }
}
