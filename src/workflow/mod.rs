pub mod events;
pub mod pipeline;
pub mod validation;

pub use events::{EntityObserver, EventPersistManager};
pub use pipeline::{ColumnWorkflow, DocumentWorkflow, KeyValueWorkflow, Workflow};
pub use validation::{
    ConstraintViolation, NoopValidator, RuleValidator, Validator, ValidatorFactory,
    validate_entity,
};
