use thiserror::Error;

use crate::workflow::ConstraintViolation;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("{0} is required")]
    NullArgument(String),

    #[error("{message}")]
    ValidationFailed {
        message: String,
        violations: Vec<ConstraintViolation>,
    },

    #[error("There is an issue to create a new instance of this class using this constructor: {constructor}")]
    Mapping {
        constructor: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("No unique result to the method: {method}")]
    NonUniqueResult { method: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Missing constructor argument '{0}'")]
    MissingArgument(String),

    #[error("Entity '{0}' is not mapped")]
    UnknownEntity(String),

    #[error("Entity '{0}' has no id value")]
    IdNotFound(String),

    #[error("No collection supplier registered for {0}")]
    UnsupportedCollection(String),

    #[error("Dynamic query error: {0}")]
    DynamicQuery(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, MappingError>;

impl MappingError {
    pub fn null_argument(what: impl Into<String>) -> Self {
        Self::NullArgument(what.into())
    }

    /// Wraps an instantiation failure, naming the constructor that was attempted.
    pub fn mapping(
        constructor: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Mapping {
            constructor: constructor.into(),
            source: source.into(),
        }
    }

    pub fn is_null_argument(&self) -> bool {
        matches!(self, Self::NullArgument(_))
    }

    pub fn is_validation_failed(&self) -> bool {
        matches!(self, Self::ValidationFailed { .. })
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping { .. })
    }

    pub fn is_non_unique_result(&self) -> bool {
        matches!(self, Self::NonUniqueResult { .. })
    }
}

impl<T> From<std::sync::PoisonError<T>> for MappingError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_error_names_constructor_and_keeps_cause() {
        let err = MappingError::mapping(
            "Person::new(name, age)",
            MappingError::MissingArgument("name".to_string()),
        );

        assert!(err.is_mapping());
        assert!(err.to_string().contains("Person::new(name, age)"));

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Missing constructor argument 'name'");
    }

    #[test]
    fn test_null_argument_message() {
        let err = MappingError::null_argument("entity");
        assert!(err.is_null_argument());
        assert_eq!(err.to_string(), "entity is required");
    }
}
