use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::core::{Result, Value};

/// Per-field coercion between the entity-side value and its stored form.
pub trait AttributeConverter: Send + Sync + 'static {
    fn to_record_value(&self, value: Value) -> Result<Value>;

    fn to_entity_value(&self, value: Value) -> Result<Value>;
}

/// Reference to an attribute converter type, resolved through [`Converters`].
#[derive(Clone, Copy)]
pub struct ConverterRef {
    type_id: TypeId,
    name: &'static str,
    create: fn() -> Arc<dyn AttributeConverter>,
}

fn create_converter<C: AttributeConverter + Default>() -> Arc<dyn AttributeConverter> {
    Arc::new(C::default())
}

impl ConverterRef {
    pub fn of<C: AttributeConverter + Default>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
            create: create_converter::<C>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ConverterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConverterRef").field(&self.name).finish()
    }
}

impl PartialEq for ConverterRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// Attribute converter instances, one per converter type.
pub struct Converters {
    instances: RwLock<HashMap<TypeId, Arc<dyn AttributeConverter>>>,
}

impl Converters {
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a configured instance; it wins over lazy creation.
    pub fn register<C: AttributeConverter>(&self, converter: C) -> Result<()> {
        let mut instances = self.instances.write()?;
        instances.insert(TypeId::of::<C>(), Arc::new(converter));
        Ok(())
    }

    pub fn get(&self, reference: &ConverterRef) -> Result<Arc<dyn AttributeConverter>> {
        if let Some(found) = self.instances.read()?.get(&reference.type_id) {
            return Ok(Arc::clone(found));
        }

        let mut instances = self.instances.write()?;
        let converter = instances.entry(reference.type_id).or_insert_with(|| {
            log::info!(
                "Attribute converter {} not registered, creating a new instance",
                reference.name
            );
            (reference.create)()
        });
        Ok(Arc::clone(converter))
    }

    pub fn len(&self) -> usize {
        self.instances.read().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Converters {
    fn default() -> Self {
        Self::new()
    }
}
