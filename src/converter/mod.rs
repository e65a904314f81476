pub mod entity;
mod field_strategy;
pub mod key_value;

pub use entity::EntityConverter;
pub use key_value::{KeyValueEntity, KeyValueEntityConverter};

use crate::core::Result;
use crate::mapping::Mapped;

/// Converts entities to the record shape of one storage family.
pub trait RecordConverter: Send + Sync {
    type Record: Send + 'static;

    fn to_record<T: Mapped>(&self, entity: &T) -> Result<Self::Record>;

    fn to_entity<T: Mapped>(&self, record: Self::Record) -> Result<T>;
}
