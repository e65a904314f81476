use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Result, Value};

/// One named field of a [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub value: Value,
}

impl RecordField {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Schema-less structure exchanged with storage backends.
///
/// Field names are unique within one record. Insertion order is kept for
/// serialization, equality ignores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    name: String,
    fields: Vec<RecordField>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Adds a field, replacing the value of an existing field with the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.value = value,
            None => self.fields.push(RecordField { name, value }),
        }
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(idx).value)
    }

    /// Moves every field of `other` into this record.
    pub fn splice(&mut self, other: Record) {
        for field in other.fields {
            self.add(field.name, field.value);
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn into_fields(self) -> Vec<RecordField> {
        self.fields
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|f| other.get(&f.name) == Some(&f.value))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{}={}", field.name, field.value))
            .collect();
        write!(f, "{}{{{}}}", self.name, parts.join(", "))
    }
}

impl FromIterator<RecordField> for Record {
    fn from_iter<I: IntoIterator<Item = RecordField>>(iter: I) -> Self {
        let mut record = Record::default();
        for field in iter {
            record.add(field.name, field.value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_existing_field() {
        let mut record = Record::new("Person");
        record.add("name", "Ada").add("age", 36i64);
        record.add("name", "Grace");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name"), Some(&Value::from("Grace")));
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["name", "age"]);
    }

    #[test]
    fn test_equality_ignores_field_order() {
        let a = Record::new("Person").with("name", "Ada").with("age", 36i64);
        let b = Record::new("Person").with("age", 36i64).with("name", "Ada");
        let c = Record::new("Person").with("age", 37i64).with("name", "Ada");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Record::new("Animal").with("name", "Ada").with("age", 36i64));
    }

    #[test]
    fn test_splice_flattens_fields() {
        let mut person = Record::new("Person").with("name", "Ada");
        person.splice(Record::new("Address").with("city", "London").with("street", "Baker"));

        assert_eq!(person.len(), 3);
        assert_eq!(person.name(), "Person");
        assert_eq!(person.get("city"), Some(&Value::from("London")));
    }

    #[test]
    fn test_json_keeps_nested_shape() {
        let record = Record::new("Person")
            .with("name", "Ada")
            .with("address", Record::new("Address").with("city", "London"))
            .with(
                "phones",
                vec![
                    Record::new("Phone").with("number", "1"),
                    Record::new("Phone").with("number", "2"),
                ],
            );

        let json = record.to_json().unwrap();
        let back = Record::from_json(&json).unwrap();

        assert_eq!(back, record);
        assert_eq!(back.names().collect::<Vec<_>>(), vec!["name", "address", "phones"]);
    }

    #[test]
    fn test_remove_returns_value() {
        let mut record = Record::new("Person").with("id", 10i64);
        assert_eq!(record.remove("id"), Some(Value::Integer(10)));
        assert!(record.is_empty());
        assert_eq!(record.remove("id"), None);
    }
}
