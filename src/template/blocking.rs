use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;

use super::manager::{AsyncDocumentManager, DocumentManager, DocumentQuery};
use crate::core::{MappingError, Record, Result};

/// Exposes a blocking [`DocumentManager`] as an [`AsyncDocumentManager`] by
/// running every call on tokio's blocking pool.
pub struct SpawnBlocking<M> {
    manager: Arc<M>,
}

impl<M> SpawnBlocking<M> {
    pub fn new(manager: Arc<M>) -> Self {
        Self { manager }
    }

    pub fn inner(&self) -> &Arc<M> {
        &self.manager
    }
}

impl<M> Clone for SpawnBlocking<M> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

async fn run<M, R, F>(manager: &Arc<M>, call: F) -> Result<R>
where
    M: DocumentManager + 'static,
    R: Send + 'static,
    F: FnOnce(&M) -> Result<R> + Send + 'static,
{
    let manager = Arc::clone(manager);
    task::spawn_blocking(move || call(&manager))
        .await
        .map_err(|err| MappingError::Storage(format!("blocking task failed: {}", err)))?
}

#[async_trait]
impl<M: DocumentManager + 'static> AsyncDocumentManager for SpawnBlocking<M> {
    async fn insert(&self, record: Record) -> Result<Record> {
        run(&self.manager, move |m| m.insert(record)).await
    }

    async fn update(&self, record: Record) -> Result<Record> {
        run(&self.manager, move |m| m.update(record)).await
    }

    async fn select(&self, query: &DocumentQuery) -> Result<Vec<Record>> {
        let query = query.clone();
        run(&self.manager, move |m| Ok(m.select(&query)?.collect())).await
    }

    async fn delete(&self, query: &DocumentQuery) -> Result<usize> {
        let query = query.clone();
        run(&self.manager, move |m| m.delete(&query)).await
    }

    async fn count(&self, entity: &str) -> Result<usize> {
        let entity = entity.to_string();
        run(&self.manager, move |m| m.count(&entity)).await
    }
}
