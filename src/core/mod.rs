pub mod error;
pub mod record;
pub mod value;

pub use error::{MappingError, Result};
pub use record::{Record, RecordField};
pub use value::Value;
