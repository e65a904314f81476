//! Per-classification conversion of a single field, in both directions.

use std::any::Any;

use tracing::{Level, event};

use super::entity::EntityConverter;
use crate::core::{MappingError, Record, Result, Value};
use crate::mapping::{
    AnyBox, CollectionAccessor, EntityMetadata, FieldAccessor, FieldMapping, ObjectAccessor,
    ValueAccessor,
};

/// The conversion rule for one field, borrowed from its accessor.
///
/// Plain scalar collections travel through `Default` as a `Value::Array`.
pub(crate) enum FieldStrategy<'f> {
    Default(&'f dyn ValueAccessor),
    Embedded(&'f dyn ObjectAccessor),
    Entity(&'f dyn ObjectAccessor),
    Collection(&'f dyn CollectionAccessor),
}

impl<'f> FieldStrategy<'f> {
    pub(crate) fn of(field: &'f FieldMapping) -> Self {
        match field.accessor() {
            FieldAccessor::Value { accessor, .. } => Self::Default(accessor.as_ref()),
            FieldAccessor::Object {
                accessor,
                embeddable: true,
            } => Self::Embedded(accessor.as_ref()),
            FieldAccessor::Object {
                accessor,
                embeddable: false,
            } => Self::Entity(accessor.as_ref()),
            FieldAccessor::Collection(accessor) => Self::Collection(accessor.as_ref()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Default(_) => "default",
            Self::Embedded(_) => "embedded",
            Self::Entity(_) => "entity",
            Self::Collection(_) => "collection",
        }
    }

    /// Adds the field's contribution (if any) to `record`.
    pub(crate) fn write_record(
        &self,
        converter: &EntityConverter,
        field: &FieldMapping,
        entity: &dyn Any,
        record: &mut Record,
    ) -> Result<()> {
        event!(Level::TRACE, field = field.name(), strategy = self.label(), "field to record");

        match self {
            Self::Default(accessor) => {
                let Some(value) = accessor.read(entity) else {
                    return Ok(());
                };
                let value = match field.converter_ref() {
                    Some(reference) => converter
                        .converters()
                        .get(reference)?
                        .to_record_value(value)?,
                    None => value,
                };
                record.add(field.name(), value);
            }
            Self::Embedded(accessor) => {
                let Some(object) = accessor.read(entity) else {
                    return Ok(());
                };
                let target = accessor.target()?;
                let sub = converter.to_record_with(&target, object)?;
                if !sub.is_empty() {
                    record.splice(sub);
                }
            }
            Self::Entity(accessor) => {
                let Some(object) = accessor.read(entity) else {
                    return Ok(());
                };
                let target = accessor.target()?;
                let sub = converter.to_record_with(&target, object)?;
                record.add(field.name(), sub);
            }
            Self::Collection(accessor) => {
                let Some(elements) = accessor.read(entity) else {
                    return Ok(());
                };
                let target = accessor.element()?;
                let records = elements
                    .into_iter()
                    .map(|element| converter.to_record_with(&target, element))
                    .collect::<Result<Vec<Record>>>()?;
                record.add(field.name(), records);
            }
        }

        Ok(())
    }

    /// The typed value for this field, or `None` when the record has
    /// nothing for it.
    pub(crate) fn read_record(
        &self,
        converter: &EntityConverter,
        field: &FieldMapping,
        record: &Record,
    ) -> Result<Option<AnyBox>> {
        event!(Level::TRACE, field = field.name(), strategy = self.label(), "field from record");

        match self {
            Self::Default(accessor) => {
                let Some(value) = record.get(field.name()) else {
                    return Ok(None);
                };
                let value = match field.converter_ref() {
                    Some(reference) => converter
                        .converters()
                        .get(reference)?
                        .to_entity_value(value.clone())?,
                    None => value.clone(),
                };
                accessor.decode(value).map(Some)
            }
            Self::Embedded(accessor) => {
                let target = accessor.target()?;
                if converter.strict_embedded_nulls() && !mentions(&target, record)? {
                    return Ok(None);
                }

                // Flattened: the sub-object reads from the parent record.
                let sub = converter.to_entity_with(&target, record)?;
                if converter.strict_embedded_nulls()
                    && target.fields().iter().all(|f| f.is_null(&*sub))
                {
                    return Ok(None);
                }
                Ok(Some(sub))
            }
            Self::Entity(accessor) => match record.get(field.name()) {
                None => Ok(None),
                Some(Value::Record(sub)) => {
                    let target = accessor.target()?;
                    converter.to_entity_with(&target, sub).map(Some)
                }
                Some(other) => Err(unexpected(field, "a nested record", other)),
            },
            Self::Collection(accessor) => {
                let Some(value) = record.get(field.name()) else {
                    return Ok(None);
                };
                let records: Vec<&Record> = match value {
                    Value::Records(records) => records.iter().collect(),
                    Value::Array(values) => values
                        .iter()
                        .map(|v| v.as_record().ok_or_else(|| unexpected(field, "a list of records", v)))
                        .collect::<Result<_>>()?,
                    other => return Err(unexpected(field, "a list of records", other)),
                };

                let target = accessor.element()?;
                let mut staged = converter.suppliers().get(accessor.kind())?;
                for sub in records {
                    staged.add(converter.to_entity_with(&target, sub)?);
                }
                accessor.assemble(staged).map(Some)
            }
        }
    }
}

/// Whether `record` holds any field belonging to `metadata`, looking through
/// nested embeddables.
fn mentions(metadata: &EntityMetadata, record: &Record) -> Result<bool> {
    for field in metadata.fields() {
        let found = match field.accessor() {
            FieldAccessor::Object {
                accessor,
                embeddable: true,
            } => mentions(&*accessor.target()?, record)?,
            _ => record.contains(field.name()),
        };
        if found {
            return Ok(true);
        }
    }
    Ok(false)
}

fn unexpected(field: &FieldMapping, expected: &str, found: &Value) -> MappingError {
    MappingError::TypeMismatch(format!(
        "field '{}' expects {}, got {}",
        field.name(),
        expected,
        found.type_name()
    ))
}
