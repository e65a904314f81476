//! Validation engine contract and the process-wide validator.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::core::{MappingError, Result};

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub property_path: String,
    pub message: String,
    pub root: String,
}

impl ConstraintViolation {
    pub fn new(
        root: impl Into<String>,
        property_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            property_path: property_path.into(),
            message: message.into(),
            root: root.into(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConstraintViolation{{propertyPath={}, message='{}', root={}}}",
            self.property_path, self.message, self.root
        )
    }
}

/// Checks an entity; an empty result means valid.
pub trait Validator: Send + Sync {
    fn validate(&self, entity: &dyn Any) -> Vec<ConstraintViolation>;
}

/// Accepts everything.
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, _entity: &dyn Any) -> Vec<ConstraintViolation> {
        Vec::new()
    }
}

struct Rule {
    type_id: TypeId,
    root: &'static str,
    property: String,
    message: String,
    check: Box<dyn Fn(&dyn Any) -> bool + Send + Sync>,
}

/// Predicate rules registered per entity type, evaluated in order.
#[derive(Default)]
pub struct RuleValidator {
    rules: Vec<Rule>,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule; `valid` returns `false` for a violation.
    pub fn rule<T: Any>(
        mut self,
        property: impl Into<String>,
        message: impl Into<String>,
        valid: fn(&T) -> bool,
    ) -> Self {
        self.rules.push(Rule {
            type_id: TypeId::of::<T>(),
            root: type_name::<T>(),
            property: property.into(),
            message: message.into(),
            check: Box::new(move |entity: &dyn Any| entity.downcast_ref::<T>().is_none_or(valid)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Validator for RuleValidator {
    fn validate(&self, entity: &dyn Any) -> Vec<ConstraintViolation> {
        let type_id = entity.type_id();
        self.rules
            .iter()
            .filter(|rule| rule.type_id == type_id && !(rule.check)(entity))
            .map(|rule| ConstraintViolation::new(rule.root, &rule.property, &rule.message))
            .collect()
    }
}

/// Runs `validator` and turns any violations into one `ValidationFailed` error.
pub fn validate_entity(
    validator: &dyn Validator,
    entity: &dyn Any,
    entity_type: &str,
) -> Result<()> {
    let violations = validator.validate(entity);
    if violations.is_empty() {
        return Ok(());
    }

    let listed = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    Err(MappingError::ValidationFailed {
        message: format!(
            "Validation failed for {} \nList of constraint violations: [\n{}]",
            entity_type, listed
        ),
        violations,
    })
}

lazy_static! {
    static ref VALIDATOR: RwLock<Option<Arc<dyn Validator>>> = RwLock::new(None);
}

/// Holds the process-wide validator, created once and torn down with
/// [`ValidatorFactory::close`].
pub struct ValidatorFactory;

impl ValidatorFactory {
    pub fn install(validator: Arc<dyn Validator>) -> Result<()> {
        *VALIDATOR.write()? = Some(validator);
        log::debug!("validator installed");
        Ok(())
    }

    /// The installed validator, or a validator that accepts everything.
    pub fn validator() -> Result<Arc<dyn Validator>> {
        if let Some(validator) = VALIDATOR.read()?.as_ref() {
            return Ok(Arc::clone(validator));
        }

        let mut slot = VALIDATOR.write()?;
        let validator = slot.get_or_insert_with(|| Arc::new(NoopValidator) as Arc<dyn Validator>);
        Ok(Arc::clone(validator))
    }

    pub fn close() -> Result<()> {
        if VALIDATOR.write()?.take().is_some() {
            log::info!("validator factory closed");
        }
        Ok(())
    }
}
