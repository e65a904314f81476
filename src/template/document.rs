use std::any::{Any, type_name};
use std::sync::Arc;

use super::manager::{AsyncDocumentManager, DocumentManager, DocumentQuery};
use crate::converter::EntityConverter;
use crate::core::{MappingError, Record, Result, Value};
use crate::mapping::{EntityMetadata, Mapped};
use crate::repository::{
    DynamicReturn, MethodDescriptor, Page, Pageable, RepositoryReturn, ResultStream, ReturnShape,
    find_pageable, find_special_parameters, to_single_result,
};
use crate::workflow::DocumentWorkflow;

/// Entity-level operations over a document manager.
pub struct DocumentTemplate<M> {
    workflow: DocumentWorkflow,
    manager: Arc<M>,
}

impl<M> DocumentTemplate<M> {
    pub fn new(workflow: DocumentWorkflow, manager: Arc<M>) -> Self {
        Self { workflow, manager }
    }

    pub fn workflow(&self) -> &DocumentWorkflow {
        &self.workflow
    }

    pub fn manager(&self) -> &Arc<M> {
        &self.manager
    }

    fn converter(&self) -> &EntityConverter {
        self.workflow.converter()
    }
}

fn id_query(metadata: &EntityMetadata, id: Value) -> Result<DocumentQuery> {
    let field = metadata
        .id()
        .ok_or_else(|| MappingError::IdNotFound(metadata.name().to_string()))?;
    Ok(DocumentQuery::select(metadata.name()).where_eq(field.name(), id))
}

impl<M: DocumentManager + 'static> DocumentTemplate<M> {
    pub fn insert<T: Mapped>(&self, entity: impl Into<Option<T>>) -> Result<T> {
        self.workflow
            .flow(entity, |record: Record| self.manager.insert(record))
    }

    pub fn update<T: Mapped>(&self, entity: impl Into<Option<T>>) -> Result<T> {
        self.workflow
            .flow(entity, |record: Record| self.manager.update(record))
    }

    pub fn find_by_id<T: Mapped>(&self, id: impl Into<Option<Value>>) -> Result<Option<T>> {
        let id = id.into().ok_or_else(|| MappingError::null_argument("id"))?;
        let metadata = T::metadata()?;
        let query = id_query(&metadata, id)?;

        let method = MethodDescriptor::new(type_name::<T>(), "find_by_id", ReturnShape::Optional);
        let single = to_single_result(method, || self.manager.select(&query));
        single()?
            .map(|record| self.converter().to_entity(&record))
            .transpose()
    }

    pub fn find_all<T: Mapped>(&self) -> Result<Vec<T>> {
        let metadata = T::metadata()?;
        self.select(DocumentQuery::select(metadata.name()))
    }

    pub fn select<T: Mapped>(&self, query: DocumentQuery) -> Result<Vec<T>> {
        self.manager
            .select(&query)?
            .map(|record| self.converter().to_entity(&record))
            .collect()
    }

    pub fn delete_by_id<T: Mapped>(&self, id: impl Into<Option<Value>>) -> Result<bool> {
        let id = id.into().ok_or_else(|| MappingError::null_argument("id"))?;
        let metadata = T::metadata()?;
        Ok(self.manager.delete(&id_query(&metadata, id)?)? > 0)
    }

    pub fn count<T: Mapped>(&self) -> Result<usize> {
        let metadata = T::metadata()?;
        self.manager.count(metadata.name())
    }

    /// Runs `query` for a repository method and shapes the result the way
    /// `method` declares. A [`Pageable`] among `params` pages the query.
    pub fn query<T: Mapped>(
        &self,
        method: MethodDescriptor,
        query: DocumentQuery,
        params: &[&dyn Any],
    ) -> Result<RepositoryReturn<T>> {
        let special = find_special_parameters(params);
        let pageable = find_pageable(params);
        let mut query = query;
        query.sorts.extend(special.sorts.iter().cloned());
        if let Some(limit) = special.limit {
            query.skip = limit.start.saturating_sub(1);
            query.limit = Some(limit.max_results);
        }

        let fetch = Fetch {
            manager: Arc::clone(&self.manager),
            converter: self.converter().clone(),
        };

        let single = {
            let manager = Arc::clone(&fetch.manager);
            let converter = fetch.converter.clone();
            let query = query.clone();
            let records = to_single_result(method, move || manager.select(&query));
            move || -> Result<Option<T>> {
                records()?
                    .map(|record| converter.to_entity(&record))
                    .transpose()
            }
        };
        let result = {
            let fetch = fetch.clone();
            let query = query.clone();
            move || fetch.entities::<T>(&query)
        };

        let mut builder = DynamicReturn::builder()
            .with_class_source(type_name::<T>())
            .with_method_source(method)
            .with_single_result(single)
            .with_result(result)
            .with_pagination(pageable.clone());

        if pageable.is_some() {
            let single_page = {
                let fetch = fetch.clone();
                let query = query.clone();
                move |pageable: &Pageable| -> Result<Option<T>> {
                    let paged = paged(&query, pageable);
                    let single = to_single_result(method, || fetch.manager.select(&paged));
                    single()?
                        .map(|record| fetch.converter.to_entity(&record))
                        .transpose()
                }
            };
            let stream_page = {
                let fetch = fetch.clone();
                let query = query.clone();
                move |pageable: &Pageable| fetch.entities::<T>(&paged(&query, pageable))
            };
            let page = move |pageable: &Pageable| -> Result<Page<T>> {
                let content: Vec<T> = fetch.entities::<T>(&paged(&query, pageable))?.collect();
                Ok(Page::new(content, pageable.clone()))
            };

            builder = builder
                .with_single_result_pagination(single_page)
                .with_stream_pagination(stream_page)
                .with_page(page);
        }

        builder.build()?.execute()
    }
}

fn paged(query: &DocumentQuery, pageable: &Pageable) -> DocumentQuery {
    let mut paged = query.clone();
    paged.skip = query.skip.saturating_add(pageable.offset());
    paged.limit = Some(pageable.size());
    paged.sorts.extend(pageable.sorts().iter().cloned());
    paged
}

struct Fetch<M> {
    manager: Arc<M>,
    converter: EntityConverter,
}

impl<M> Clone for Fetch<M> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            converter: self.converter.clone(),
        }
    }
}

impl<M: DocumentManager> Fetch<M> {
    fn entities<T: Mapped>(&self, query: &DocumentQuery) -> Result<ResultStream<T>> {
        let entities = self
            .manager
            .select(query)?
            .map(|record| self.converter.to_entity(&record))
            .collect::<Result<Vec<T>>>()?;
        Ok(Box::new(entities.into_iter()))
    }
}

impl<M: AsyncDocumentManager> DocumentTemplate<M> {
    /// ```
    /// use recordmap::{Entity, Mapper, MapperConfig};
    ///
    /// #[derive(Entity, Debug)]
    /// struct Note {
    ///     #[mapping(id)]
    ///     id: Option<i64>,
    ///     text: String,
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let template = Mapper::new(MapperConfig::default()).unwrap().memory_template().unwrap();
    /// let note = template
    ///     .insert_async(Note { id: None, text: "hello".to_string() })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(note.id, Some(1));
    /// # });
    /// ```
    pub async fn insert_async<T: Mapped>(&self, entity: impl Into<Option<T>>) -> Result<T> {
        self.workflow
            .flow_async(entity, |record: Record| self.manager.insert(record))
            .await
    }

    pub async fn update_async<T: Mapped>(&self, entity: impl Into<Option<T>>) -> Result<T> {
        self.workflow
            .flow_async(entity, |record: Record| self.manager.update(record))
            .await
    }

    pub async fn find_all_async<T: Mapped>(&self) -> Result<Vec<T>> {
        let metadata = T::metadata()?;
        self.manager
            .select(&DocumentQuery::select(metadata.name()))
            .await?
            .iter()
            .map(|record| self.converter().to_entity(record))
            .collect()
    }
}
