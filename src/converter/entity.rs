use std::any::Any;
use std::sync::Arc;

use tracing::{Level, event};

use super::RecordConverter;
use super::field_strategy::FieldStrategy;
use crate::core::{MappingError, Record, Result};
use crate::mapping::accessor::downcast_box;
use crate::mapping::{
    AnyBox, CollectionSuppliers, ConstructorBuilder, ConstructorListener, Converters,
    EntityMetadata, InstanceStrategy, Mapped,
};

/// Converts mapped types to records and back.
///
/// Holds no per-call state; clones share the converter and supplier
/// registries.
#[derive(Clone)]
pub struct EntityConverter {
    converters: Arc<Converters>,
    suppliers: Arc<CollectionSuppliers>,
    listener: Option<Arc<dyn ConstructorListener>>,
    strict_embedded_nulls: bool,
}

impl EntityConverter {
    pub fn new() -> Self {
        Self {
            converters: Arc::new(Converters::new()),
            suppliers: Arc::new(CollectionSuppliers::with_defaults()),
            listener: None,
            strict_embedded_nulls: true,
        }
    }

    pub fn with_converters(mut self, converters: Arc<Converters>) -> Self {
        self.converters = converters;
        self
    }

    pub fn with_suppliers(mut self, suppliers: Arc<CollectionSuppliers>) -> Self {
        self.suppliers = suppliers;
        self
    }

    /// Receives a [`crate::mapping::ConstructorEvent`] for every constructor call.
    pub fn with_listener(mut self, listener: Arc<dyn ConstructorListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// When set (the default), an embedded object whose fields are all
    /// absent from the record is left unset instead of being built empty.
    pub fn with_strict_embedded_nulls(mut self, strict: bool) -> Self {
        self.strict_embedded_nulls = strict;
        self
    }

    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    pub fn suppliers(&self) -> &CollectionSuppliers {
        &self.suppliers
    }

    pub fn strict_embedded_nulls(&self) -> bool {
        self.strict_embedded_nulls
    }

    pub fn to_record<T: Mapped>(&self, entity: &T) -> Result<Record> {
        let metadata = T::metadata()?;
        self.to_record_with(&metadata, entity)
    }

    pub fn to_record_with(&self, metadata: &EntityMetadata, entity: &dyn Any) -> Result<Record> {
        if !metadata.is_instance(entity) {
            return Err(MappingError::TypeMismatch(format!(
                "value is not an instance of {}",
                metadata.type_name()
            )));
        }

        let mut record = Record::new(metadata.name());
        for field in metadata.fields() {
            FieldStrategy::of(field).write_record(self, field, entity, &mut record)?;
        }
        Ok(record)
    }

    pub fn to_entity<T: Mapped>(&self, record: &Record) -> Result<T> {
        let metadata = T::metadata()?;
        let entity = self.to_entity_with(&metadata, record)?;
        downcast_box::<T>(entity, metadata.name())
    }

    pub fn to_entity_with(&self, metadata: &EntityMetadata, record: &Record) -> Result<AnyBox> {
        event!(Level::TRACE, entity = metadata.name(), "record to entity");

        match metadata.instance_strategy() {
            InstanceStrategy::NoArgs(create) => {
                let mut entity = create();
                self.populate(metadata, &mut *entity, record, |_| true)?;
                Ok(entity)
            }
            InstanceStrategy::Constructor(descriptor) => {
                let mut builder = ConstructorBuilder::of(metadata)?
                    .with_listener(self.listener.as_deref());

                for parameter in builder.parameters() {
                    let field = metadata.field(parameter).ok_or_else(|| {
                        MappingError::InvalidArgument(format!(
                            "Constructor {} takes unmapped field '{}'",
                            descriptor.signature(),
                            parameter
                        ))
                    })?;
                    match FieldStrategy::of(field).read_record(self, field, record)? {
                        Some(value) => builder.add(value),
                        None => builder.add_empty_parameter(),
                    }
                }

                let mut entity = builder.build()?;
                self.populate(metadata, &mut *entity, record, |field| {
                    !descriptor.is_parameter(field)
                })?;
                Ok(entity)
            }
        }
    }

    /// Writes the record's values into an existing instance through the
    /// field setters. Fields missing from the record are left untouched.
    pub fn fill_entity<T: Mapped>(&self, entity: &mut T, record: &Record) -> Result<()> {
        let metadata = T::metadata()?;
        self.populate(&metadata, entity, record, |_| true)
    }

    fn populate(
        &self,
        metadata: &EntityMetadata,
        entity: &mut dyn Any,
        record: &Record,
        include: impl Fn(&str) -> bool,
    ) -> Result<()> {
        for field in metadata.fields().iter().filter(|f| include(f.field())) {
            if let Some(value) = FieldStrategy::of(field).read_record(self, field, record)? {
                field.write(entity, value)?;
            }
        }
        Ok(())
    }
}

impl Default for EntityConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordConverter for EntityConverter {
    type Record = Record;

    fn to_record<T: Mapped>(&self, entity: &T) -> Result<Record> {
        EntityConverter::to_record(self, entity)
    }

    fn to_entity<T: Mapped>(&self, record: Record) -> Result<T> {
        EntityConverter::to_entity(self, &record)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::core::Value;
    use crate::mapping::{AttributeConverter, FieldMapping};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Address {
        street: Option<String>,
        city: Option<String>,
    }

    impl Mapped for Address {
        const EMBEDDABLE: bool = true;

        fn describe() -> Result<EntityMetadata> {
            EntityMetadata::builder::<Address>("Address")
                .field(FieldMapping::value::<Address, String>(
                    "street",
                    |a| a.street.as_ref(),
                    |a, v| a.street = Some(v),
                ))
                .field(FieldMapping::value::<Address, String>(
                    "city",
                    |a| a.city.as_ref(),
                    |a, v| a.city = Some(v),
                ))
                .default_constructor()
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Phone {
        number: String,
    }

    impl Mapped for Phone {
        const EMBEDDABLE: bool = true;

        fn describe() -> Result<EntityMetadata> {
            EntityMetadata::builder::<Phone>("Phone")
                .field(FieldMapping::value::<Phone, String>(
                    "number",
                    |p| Some(&p.number),
                    |p, v| p.number = v,
                ))
                .default_constructor()
                .build()
        }
    }

    #[derive(Default)]
    struct Upper;

    impl AttributeConverter for Upper {
        fn to_record_value(&self, value: Value) -> Result<Value> {
            Ok(Value::Text(value.to_string().to_uppercase()))
        }

        fn to_entity_value(&self, value: Value) -> Result<Value> {
            Ok(Value::Text(value.to_string().to_lowercase()))
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Contact {
        id: Option<i64>,
        nick: Option<String>,
        address: Option<Address>,
        phones: Option<VecDeque<Phone>>,
    }

    impl Mapped for Contact {
        fn describe() -> Result<EntityMetadata> {
            EntityMetadata::builder::<Contact>("Contact")
                .field(
                    FieldMapping::value::<Contact, i64>("id", |c| c.id.as_ref(), |c, v| c.id = Some(v))
                        .id(),
                )
                .field(
                    FieldMapping::value::<Contact, String>(
                        "nick",
                        |c| c.nick.as_ref(),
                        |c, v| c.nick = Some(v),
                    )
                    .converter::<Upper>(),
                )
                .field(FieldMapping::object::<Contact, Address>(
                    "address",
                    |c| c.address.as_ref(),
                    |c, v| c.address = Some(v),
                ))
                .field(FieldMapping::collection::<Contact, VecDeque<Phone>>(
                    "phones",
                    |c| c.phones.as_ref(),
                    |c, v| c.phones = Some(v),
                ))
                .default_constructor()
                .build()
        }
    }

    #[test]
    fn test_attribute_converter_applies_both_ways() {
        let converter = EntityConverter::new();
        let contact = Contact {
            id: Some(1),
            nick: Some("ada".to_string()),
            ..Default::default()
        };

        let record = converter.to_record(&contact).unwrap();
        assert_eq!(record.get("nick"), Some(&Value::from("ADA")));

        let back: Contact = converter.to_entity(&record).unwrap();
        assert_eq!(back, contact);
    }

    #[test]
    fn test_all_null_embedded_contributes_nothing() {
        let converter = EntityConverter::new();
        let contact = Contact {
            id: Some(1),
            address: Some(Address::default()),
            ..Default::default()
        };

        let record = converter.to_record(&contact).unwrap();
        assert_eq!(record, Record::new("Contact").with("id", 1i64));

        let back: Contact = converter.to_entity(&record).unwrap();
        assert_eq!(back.address, None);
    }

    #[test]
    fn test_lenient_embedded_builds_empty_object() {
        let converter = EntityConverter::new().with_strict_embedded_nulls(false);
        let back: Contact = converter
            .to_entity(&Record::new("Contact").with("id", 1i64))
            .unwrap();
        assert_eq!(back.address, Some(Address::default()));
    }

    #[test]
    fn test_deque_keeps_element_order() {
        let converter = EntityConverter::new();
        let record = Record::new("Contact").with(
            "phones",
            vec![
                Record::new("Phone").with("number", "234"),
                Record::new("Phone").with("number", "567"),
            ],
        );

        let contact: Contact = converter.to_entity(&record).unwrap();
        let phones: Vec<String> = contact
            .phones
            .unwrap()
            .into_iter()
            .map(|p| p.number)
            .collect();
        assert_eq!(phones, vec!["234", "567"]);
    }

    #[test]
    fn test_fill_entity_keeps_missing_fields() {
        let converter = EntityConverter::new();
        let mut contact = Contact {
            id: Some(1),
            nick: Some("ada".to_string()),
            ..Default::default()
        };

        converter
            .fill_entity(&mut contact, &Record::new("Contact").with("id", 9i64))
            .unwrap();
        assert_eq!(contact.id, Some(9));
        assert_eq!(contact.nick.as_deref(), Some("ada"));
    }

    #[test]
    fn test_rejects_foreign_instance() {
        let converter = EntityConverter::new();
        let metadata = Contact::metadata().unwrap();
        let err = converter
            .to_record_with(&metadata, &Phone::default())
            .unwrap_err();
        assert!(matches!(err, MappingError::TypeMismatch(_)));
    }
}
