use async_trait::async_trait;

use crate::core::{Record, Result, Value};
use crate::repository::{ResultStream, Sort};

/// A select/delete request against one entity's records.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub entity: String,
    /// Equality condition on one field.
    pub condition: Option<(String, Value)>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub sorts: Vec<Sort>,
}

impl DocumentQuery {
    pub fn select(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            condition: None,
            skip: 0,
            limit: None,
            sorts: Vec::new(),
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition = Some((field.into(), value.into()));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        match &self.condition {
            Some((field, value)) => record.get(field) == Some(value),
            None => true,
        }
    }
}

/// Blocking document storage backend.
pub trait DocumentManager: Send + Sync {
    /// Stores a new record and returns it as stored (ids assigned).
    fn insert(&self, record: Record) -> Result<Record>;

    fn update(&self, record: Record) -> Result<Record>;

    fn select(&self, query: &DocumentQuery) -> Result<ResultStream<Record>>;

    /// Returns the number of deleted records.
    fn delete(&self, query: &DocumentQuery) -> Result<usize>;

    fn count(&self, entity: &str) -> Result<usize>;
}

/// Non-blocking document storage backend.
#[async_trait]
pub trait AsyncDocumentManager: Send + Sync {
    async fn insert(&self, record: Record) -> Result<Record>;

    async fn update(&self, record: Record) -> Result<Record>;

    async fn select(&self, query: &DocumentQuery) -> Result<Vec<Record>>;

    async fn delete(&self, query: &DocumentQuery) -> Result<usize>;

    async fn count(&self, entity: &str) -> Result<usize>;
}
