pub mod blocking;
pub mod document;
pub mod manager;
pub mod memory;

pub use blocking::SpawnBlocking;
pub use document::DocumentTemplate;
pub use manager::{AsyncDocumentManager, DocumentManager, DocumentQuery};
pub use memory::InMemoryDocumentManager;
