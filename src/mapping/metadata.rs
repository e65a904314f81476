//! Per-type mapping metadata and the process-wide registry that memoizes it.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use tracing::{Level, event};

use super::accessor::AnyBox;
use super::constructor::{ConstructorArgs, ConstructorDescriptor};
use super::field::{FieldMapping, MappingType};
use crate::core::{MappingError, Result};

/// A type that can be converted to and from records.
///
/// Implemented by `#[derive(Entity)]` / `#[derive(Embeddable)]`, or by hand
/// with [`EntityMetadata::builder`].
pub trait Mapped: Any + Send + Sized {
    /// Embeddable types are flattened into the record that contains them.
    const EMBEDDABLE: bool = false;

    /// Builds the metadata. Called at most once per successful registration;
    /// use [`Mapped::metadata`] everywhere else.
    fn describe() -> Result<EntityMetadata>;

    fn metadata() -> Result<Arc<EntityMetadata>> {
        EntitiesMetadata::get::<Self>()
    }
}

/// How instances are created during reverse conversion.
pub enum InstanceStrategy {
    /// Allocate with `Default`, then write every field through its setter.
    NoArgs(fn() -> AnyBox),
    /// Pass the listed fields positionally to a constructor; remaining
    /// fields are written through setters afterwards.
    Constructor(ConstructorDescriptor),
}

fn default_instance<T: Default + Send + 'static>() -> AnyBox {
    Box::new(T::default())
}

pub struct EntityMetadata {
    name: String,
    type_name: &'static str,
    type_id: TypeId,
    embeddable: bool,
    fields: Vec<FieldMapping>,
    id: Option<usize>,
    instance: InstanceStrategy,
}

impl EntityMetadata {
    pub fn builder<T: Mapped>(name: impl Into<String>) -> EntityMetadataBuilder<T> {
        EntityMetadataBuilder {
            name: name.into(),
            fields: Vec::new(),
            instance: None,
            _entity: PhantomData,
        }
    }

    /// Record name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn is_embeddable(&self) -> bool {
        self.embeddable
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn field(&self, field: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.field() == field)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn id(&self) -> Option<&FieldMapping> {
        self.id.map(|idx| &self.fields[idx])
    }

    pub fn instance_strategy(&self) -> &InstanceStrategy {
        &self.instance
    }

    pub fn constructor(&self) -> Option<&ConstructorDescriptor> {
        match &self.instance {
            InstanceStrategy::Constructor(descriptor) => Some(descriptor),
            InstanceStrategy::NoArgs(_) => None,
        }
    }

    /// A fresh instance for the setter strategy.
    pub fn new_instance(&self) -> Option<AnyBox> {
        match &self.instance {
            InstanceStrategy::NoArgs(create) => Some(create()),
            InstanceStrategy::Constructor(_) => None,
        }
    }

    pub fn is_instance(&self, entity: &dyn Any) -> bool {
        entity.type_id() == self.type_id
    }

    pub fn fields_of(&self, mapping_type: MappingType) -> impl Iterator<Item = &FieldMapping> {
        self.fields
            .iter()
            .filter(move |f| f.mapping_type() == mapping_type)
    }
}

impl fmt::Debug for EntityMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMetadata")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("embeddable", &self.embeddable)
            .field("fields", &self.fields)
            .field("constructor", &self.constructor())
            .finish()
    }
}

pub struct EntityMetadataBuilder<T> {
    name: String,
    fields: Vec<FieldMapping>,
    instance: Option<InstanceStrategy>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Mapped> EntityMetadataBuilder<T> {
    pub fn field(mut self, field: FieldMapping) -> Self {
        self.fields.push(field);
        self
    }

    /// Instances start from `T::default()`.
    pub fn default_constructor(mut self) -> Self
    where
        T: Default,
    {
        self.instance = Some(InstanceStrategy::NoArgs(default_instance::<T>));
        self
    }

    pub fn constructor(
        mut self,
        signature: impl Into<String>,
        parameters: Vec<&'static str>,
        build: fn(&mut ConstructorArgs) -> Result<T>,
    ) -> Self {
        self.instance = Some(InstanceStrategy::Constructor(ConstructorDescriptor::new(
            signature, parameters, build,
        )));
        self
    }

    pub fn build(self) -> Result<EntityMetadata> {
        let ids: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_id())
            .map(|(idx, _)| idx)
            .collect();
        if ids.len() > 1 {
            return Err(MappingError::InvalidArgument(format!(
                "Entity '{}' declares {} id fields, at most one is allowed",
                self.name,
                ids.len()
            )));
        }

        for (idx, field) in self.fields.iter().enumerate() {
            if self.fields[..idx].iter().any(|f| f.name() == field.name()) {
                return Err(MappingError::InvalidArgument(format!(
                    "Entity '{}' maps '{}' more than once",
                    self.name,
                    field.name()
                )));
            }
        }

        let instance = self.instance.ok_or_else(|| {
            MappingError::InvalidArgument(format!(
                "Entity '{}' has neither a default nor a mapped constructor",
                self.name
            ))
        })?;

        if let InstanceStrategy::Constructor(descriptor) = &instance {
            if let Some(unknown) = descriptor
                .parameters()
                .iter()
                .find(|p| !self.fields.iter().any(|f| f.field() == **p))
            {
                return Err(MappingError::InvalidArgument(format!(
                    "Constructor {} takes unmapped field '{}'",
                    descriptor.signature(),
                    unknown
                )));
            }
        }

        Ok(EntityMetadata {
            name: self.name,
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            embeddable: T::EMBEDDABLE,
            fields: self.fields,
            id: ids.first().copied(),
            instance,
        })
    }
}

lazy_static! {
    static ref ENTITIES: RwLock<HashMap<TypeId, Arc<EntityMetadata>>> =
        RwLock::new(HashMap::new());
}

/// Process-wide metadata registry.
///
/// Concurrent first lookups may both run `describe`; the first insert wins
/// and every caller gets that instance.
pub struct EntitiesMetadata;

impl EntitiesMetadata {
    pub fn get<T: Mapped>() -> Result<Arc<EntityMetadata>> {
        let key = TypeId::of::<T>();
        if let Some(found) = ENTITIES.read()?.get(&key) {
            return Ok(Arc::clone(found));
        }

        let computed = Arc::new(T::describe()?);
        event!(
            Level::DEBUG,
            entity = computed.name(),
            fields = computed.fields().len(),
            "entity metadata computed"
        );

        let mut entities = ENTITIES.write()?;
        Ok(Arc::clone(entities.entry(key).or_insert(computed)))
    }

    pub fn find_by_name(name: &str) -> Result<Arc<EntityMetadata>> {
        ENTITIES
            .read()?
            .values()
            .find(|m| m.name() == name)
            .cloned()
            .ok_or_else(|| MappingError::UnknownEntity(name.to_string()))
    }

    pub fn is_loaded<T: Mapped>() -> bool {
        ENTITIES
            .read()
            .map(|e| e.contains_key(&TypeId::of::<T>()))
            .unwrap_or(false)
    }
}
