use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use tracing::{Level, event};

use super::manager::{AsyncDocumentManager, DocumentManager, DocumentQuery};
use crate::config::Settings;
use crate::core::{MappingError, Record, Result, Value};
use crate::repository::{Direction, ResultStream, Sort};

/// Document manager keeping records in process memory, grouped by record
/// name.
///
/// Records inserted without an id get the next value of a counter.
/// Settings: `id.field` (default `id`), `id.start` (default `1`).
pub struct InMemoryDocumentManager {
    id_field: String,
    next_id: AtomicI64,
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl InMemoryDocumentManager {
    pub fn new() -> Self {
        Self::with_id("id", 1)
    }

    pub fn with_id(id_field: impl Into<String>, start: i64) -> Self {
        Self {
            id_field: id_field.into(),
            next_id: AtomicI64::new(start),
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let start = settings.get_parsed::<i64>("id.start")?.unwrap_or(1);
        Ok(Self::with_id(settings.get_or("id.field", "id"), start))
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    fn insert_record(&self, mut record: Record) -> Result<Record> {
        if !record.contains(&self.id_field) {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
            record.add(self.id_field.clone(), id);
        }

        let mut collections = self.collections.write()?;
        let records = collections.entry(record.name().to_string()).or_default();
        let id = record.get(&self.id_field).cloned();
        if records.iter().any(|r| r.get(&self.id_field) == id.as_ref()) {
            return Err(MappingError::Storage(format!(
                "{} with {} {} already exists",
                record.name(),
                self.id_field,
                id.map(|v| v.to_string()).unwrap_or_default()
            )));
        }

        event!(Level::DEBUG, entity = record.name(), "record inserted");
        records.push(record.clone());
        Ok(record)
    }

    fn update_record(&self, record: Record) -> Result<Record> {
        let id = record.get(&self.id_field).cloned().ok_or_else(|| {
            MappingError::Storage(format!("{} has no {} to update by", record.name(), self.id_field))
        })?;

        let mut collections = self.collections.write()?;
        let stored = collections
            .get_mut(record.name())
            .and_then(|records| records.iter_mut().find(|r| r.get(&self.id_field) == Some(&id)))
            .ok_or_else(|| {
                MappingError::Storage(format!("{} with {} {} not found", record.name(), self.id_field, id))
            })?;

        *stored = record.clone();
        Ok(record)
    }

    fn select_records(&self, query: &DocumentQuery) -> Result<Vec<Record>> {
        let collections = self.collections.read()?;
        let mut found: Vec<Record> = collections
            .get(&query.entity)
            .map(|records| records.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if !query.sorts.is_empty() {
            found.sort_by(|a, b| compare_records(a, b, &query.sorts));
        }

        let limit = query
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        Ok(found
            .into_iter()
            .skip(usize::try_from(query.skip).unwrap_or(usize::MAX))
            .take(limit)
            .collect())
    }

    fn delete_records(&self, query: &DocumentQuery) -> Result<usize> {
        let mut collections = self.collections.write()?;
        let Some(records) = collections.get_mut(&query.entity) else {
            return Ok(0);
        };
        let before = records.len();
        records.retain(|r| !query.matches(r));
        Ok(before - records.len())
    }

    fn count_records(&self, entity: &str) -> Result<usize> {
        Ok(self
            .collections
            .read()?
            .get(entity)
            .map(Vec::len)
            .unwrap_or(0))
    }
}

impl Default for InMemoryDocumentManager {
    fn default() -> Self {
        Self::new()
    }
}

fn compare_records(a: &Record, b: &Record, sorts: &[Sort]) -> Ordering {
    for sort in sorts {
        let ordering = match (a.get(&sort.property), b.get(&sort.property)) {
            (Some(x), Some(y)) => compare_values(x, y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = match sort.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Uuid(x), Value::Uuid(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

impl DocumentManager for InMemoryDocumentManager {
    fn insert(&self, record: Record) -> Result<Record> {
        self.insert_record(record)
    }

    fn update(&self, record: Record) -> Result<Record> {
        self.update_record(record)
    }

    fn select(&self, query: &DocumentQuery) -> Result<ResultStream<Record>> {
        Ok(Box::new(self.select_records(query)?.into_iter()))
    }

    fn delete(&self, query: &DocumentQuery) -> Result<usize> {
        self.delete_records(query)
    }

    fn count(&self, entity: &str) -> Result<usize> {
        self.count_records(entity)
    }
}

#[async_trait]
impl AsyncDocumentManager for InMemoryDocumentManager {
    async fn insert(&self, record: Record) -> Result<Record> {
        self.insert_record(record)
    }

    async fn update(&self, record: Record) -> Result<Record> {
        self.update_record(record)
    }

    async fn select(&self, query: &DocumentQuery) -> Result<Vec<Record>> {
        self.select_records(query)
    }

    async fn delete(&self, query: &DocumentQuery) -> Result<usize> {
        self.delete_records(query)
    }

    async fn count(&self, entity: &str) -> Result<usize> {
        self.count_records(entity)
    }
}
