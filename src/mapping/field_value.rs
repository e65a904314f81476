use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::core::{MappingError, Result, Value};

/// Scalar types that can live in a DEFAULT-classified field.
///
/// Nullability is expressed by the field accessor (`Option<&F>`), so
/// implementations only deal with present values.
pub trait FieldValue: Sized + Send + 'static {
    /// Plain collections of scalars report `true`; they are classified as
    /// non-embeddable collections.
    const COLLECTION: bool = false;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> MappingError {
    MappingError::TypeMismatch(format!(
        "expected {}, got {} ({})",
        expected,
        value.type_name(),
        value
    ))
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("TEXT", &other)),
        }
    }
}

impl FieldValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch("INTEGER", &value))
    }
}

impl FieldValue for i32 {
    fn to_value(&self) -> Value {
        Value::Integer(*self as i64)
    }

    fn from_value(value: Value) -> Result<Self> {
        value
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(|| mismatch("INTEGER (i32)", &value))
    }
}

impl FieldValue for u32 {
    fn to_value(&self) -> Value {
        Value::Integer(*self as i64)
    }

    fn from_value(value: Value) -> Result<Self> {
        value
            .as_i64()
            .and_then(|i| u32::try_from(i).ok())
            .ok_or_else(|| mismatch("INTEGER (u32)", &value))
    }
}

impl FieldValue for u64 {
    fn to_value(&self) -> Value {
        // Values above i64::MAX are stored as decimal text.
        match i64::try_from(*self) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(self.to_string()),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Text(s) => s.parse::<u64>().ok(),
            other => other.as_i64().and_then(|i| u64::try_from(i).ok()),
        }
        .ok_or_else(|| mismatch("INTEGER (u64)", &value))
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("FLOAT", &value))
    }
}

impl FieldValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }

    fn from_value(value: Value) -> Result<Self> {
        value
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| mismatch("FLOAT", &value))
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("BOOLEAN", &value))
    }
}

impl FieldValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            Value::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| MappingError::TypeMismatch(format!("Invalid Timestamp: {}", e))),
            other => Err(mismatch("TIMESTAMP", &other)),
        }
    }
}

impl FieldValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(d),
            Value::Text(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| MappingError::TypeMismatch(format!("Invalid Date: {}", e))),
            other => Err(mismatch("DATE", &other)),
        }
    }
}

impl FieldValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(s) => Uuid::parse_str(&s)
                .map_err(|e| MappingError::TypeMismatch(format!("Invalid UUID: {}", e))),
            other => Err(mismatch("UUID", &other)),
        }
    }
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const COLLECTION: bool = true;

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(values) => values.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("ARRAY", &other)),
        }
    }
}
