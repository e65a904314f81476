use serde::{Deserialize, Serialize};

use super::RecordConverter;
use super::entity::EntityConverter;
use crate::core::{MappingError, Record, Result, Value};
use crate::mapping::Mapped;

/// A key-value pair as stored by key-value backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueEntity {
    pub key: Value,
    pub value: Record,
}

impl KeyValueEntity {
    pub fn new(key: impl Into<Value>, value: Record) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Keys entities by their id field; the value is the entity's full record.
#[derive(Clone, Default)]
pub struct KeyValueEntityConverter {
    converter: EntityConverter,
}

impl KeyValueEntityConverter {
    pub fn new(converter: EntityConverter) -> Self {
        Self { converter }
    }

    pub fn entity_converter(&self) -> &EntityConverter {
        &self.converter
    }

    pub fn to_key_value<T: Mapped>(&self, entity: &T) -> Result<KeyValueEntity> {
        let metadata = T::metadata()?;
        let id = metadata
            .id()
            .ok_or_else(|| MappingError::IdNotFound(metadata.name().to_string()))?;

        let value = self.converter.to_record_with(&metadata, entity)?;
        let key = value
            .get(id.name())
            .cloned()
            .ok_or_else(|| MappingError::IdNotFound(metadata.name().to_string()))?;

        Ok(KeyValueEntity { key, value })
    }

    pub fn to_entity<T: Mapped>(&self, entity: KeyValueEntity) -> Result<T> {
        let metadata = T::metadata()?;
        let KeyValueEntity { key, mut value } = entity;

        if let Some(id) = metadata.id() {
            if !value.contains(id.name()) {
                value.add(id.name(), key);
            }
        }

        self.converter.to_entity(&value)
    }
}

impl RecordConverter for KeyValueEntityConverter {
    type Record = KeyValueEntity;

    fn to_record<T: Mapped>(&self, entity: &T) -> Result<KeyValueEntity> {
        self.to_key_value(entity)
    }

    fn to_entity<T: Mapped>(&self, record: KeyValueEntity) -> Result<T> {
        KeyValueEntityConverter::to_entity(self, record)
    }
}
