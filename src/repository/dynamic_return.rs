//! Adapts a lazily produced result sequence to a repository method's
//! declared return shape.

use std::any::Any;
use std::fmt;

use tracing::{Level, event};

use super::method::{MethodDescriptor, ReturnShape};
use super::pagination::{Page, Pageable, SpecialParameters};
use crate::core::{MappingError, Result};

/// A lazy, single-consumer result sequence.
pub type ResultStream<T> = Box<dyn Iterator<Item = T> + Send>;

type SingleSupplier<T> = Box<dyn FnOnce() -> Result<Option<T>> + Send>;
type StreamSupplier<T> = Box<dyn FnOnce() -> Result<ResultStream<T>> + Send>;
type PagedSingle<T> = Box<dyn FnOnce(&Pageable) -> Result<Option<T>> + Send>;
type PagedStream<T> = Box<dyn FnOnce(&Pageable) -> Result<ResultStream<T>> + Send>;
type PagedPage<T> = Box<dyn FnOnce(&Pageable) -> Result<Page<T>> + Send>;

/// Wraps a sequence supplier so it yields at most one element.
///
/// Pulls no more than two elements; a second one is a `NonUniqueResult`
/// naming `method`.
pub fn to_single_result<T, I, S>(
    method: MethodDescriptor,
    supplier: S,
) -> impl FnOnce() -> Result<Option<T>> + Send
where
    S: FnOnce() -> Result<I> + Send,
    I: IntoIterator<Item = T>,
{
    move || {
        let mut results = supplier()?.into_iter();
        let Some(first) = results.next() else {
            return Ok(None);
        };
        if results.next().is_some() {
            return Err(MappingError::NonUniqueResult {
                method: method.to_string(),
            });
        }
        Ok(Some(first))
    }
}

/// The first page request among the call arguments, if any.
pub fn find_pageable(params: &[&dyn Any]) -> Option<Pageable> {
    params
        .iter()
        .find_map(|param| param.downcast_ref::<Pageable>())
        .cloned()
}

pub fn find_special_parameters(params: &[&dyn Any]) -> SpecialParameters {
    if params.is_empty() {
        return SpecialParameters::default();
    }
    SpecialParameters::of(params)
}

/// What a repository method hands back to its caller.
pub enum RepositoryReturn<T> {
    Single(Option<T>),
    List(Vec<T>),
    Stream(ResultStream<T>),
    Page(Page<T>),
}

impl<T> RepositoryReturn<T> {
    pub fn into_optional(self) -> Result<Option<T>> {
        match self {
            Self::Single(value) => Ok(value),
            other => Err(other.wrong_shape("a single result")),
        }
    }

    /// Lists and streams both collect into a `Vec`.
    pub fn into_list(self) -> Result<Vec<T>> {
        match self {
            Self::List(values) => Ok(values),
            Self::Stream(stream) => Ok(stream.collect()),
            other => Err(other.wrong_shape("a list")),
        }
    }

    pub fn into_page(self) -> Result<Page<T>> {
        match self {
            Self::Page(page) => Ok(page),
            other => Err(other.wrong_shape("a page")),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::List(_) => "list",
            Self::Stream(_) => "stream",
            Self::Page(_) => "page",
        }
    }

    fn wrong_shape(&self, expected: &str) -> MappingError {
        MappingError::DynamicQuery(format!("expected {}, got a {} result", expected, self.kind()))
    }
}

impl<T: fmt::Debug> fmt::Debug for RepositoryReturn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => f.debug_tuple("Single").field(value).finish(),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Page(page) => f.debug_tuple("Page").field(page).finish(),
        }
    }
}

struct Paginated<T> {
    pageable: Pageable,
    single_result: PagedSingle<T>,
    stream: PagedStream<T>,
    page: PagedPage<T>,
}

/// One resolved repository call, ready to be executed once.
pub struct DynamicReturn<T> {
    class_source: String,
    method: MethodDescriptor,
    single_result: SingleSupplier<T>,
    result: StreamSupplier<T>,
    pagination: Option<Paginated<T>>,
}

impl<T: Send + 'static> DynamicReturn<T> {
    pub fn builder() -> DynamicReturnBuilder<T> {
        DynamicReturnBuilder::default()
    }

    pub fn class_source(&self) -> &str {
        &self.class_source
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn pagination(&self) -> Option<&Pageable> {
        self.pagination.as_ref().map(|p| &p.pageable)
    }

    pub fn has_pagination(&self) -> bool {
        self.pagination.is_some()
    }

    /// Produces the value for the method's declared shape, using the
    /// pagination-aware functions when a page request was given.
    pub fn execute(self) -> Result<RepositoryReturn<T>> {
        let shape = self.method.returns;
        event!(
            Level::DEBUG,
            method = %self.method,
            shape = ?shape,
            paginated = self.pagination.is_some(),
            "dynamic return"
        );

        match self.pagination {
            None => match shape {
                ReturnShape::Instance | ReturnShape::Optional => {
                    Ok(RepositoryReturn::Single((self.single_result)()?))
                }
                ReturnShape::List => Ok(RepositoryReturn::List((self.result)()?.collect())),
                ReturnShape::Stream => Ok(RepositoryReturn::Stream((self.result)()?)),
                ReturnShape::Page => Err(MappingError::DynamicQuery(format!(
                    "{} returns a page but no page request was passed",
                    self.method
                ))),
            },
            Some(paginated) => {
                let pageable = &paginated.pageable;
                match shape {
                    ReturnShape::Instance | ReturnShape::Optional => Ok(RepositoryReturn::Single(
                        (paginated.single_result)(pageable)?,
                    )),
                    ReturnShape::List => Ok(RepositoryReturn::List(
                        (paginated.stream)(pageable)?.collect(),
                    )),
                    ReturnShape::Stream => {
                        Ok(RepositoryReturn::Stream((paginated.stream)(pageable)?))
                    }
                    ReturnShape::Page => Ok(RepositoryReturn::Page((paginated.page)(pageable)?)),
                }
            }
        }
    }
}

pub struct DynamicReturnBuilder<T> {
    class_source: Option<String>,
    method: Option<MethodDescriptor>,
    single_result: Option<SingleSupplier<T>>,
    result: Option<StreamSupplier<T>>,
    pagination: Option<Pageable>,
    single_result_pagination: Option<PagedSingle<T>>,
    stream_pagination: Option<PagedStream<T>>,
    page: Option<PagedPage<T>>,
}

impl<T> Default for DynamicReturnBuilder<T> {
    fn default() -> Self {
        Self {
            class_source: None,
            method: None,
            single_result: None,
            result: None,
            pagination: None,
            single_result_pagination: None,
            stream_pagination: None,
            page: None,
        }
    }
}

impl<T: Send + 'static> DynamicReturnBuilder<T> {
    pub fn with_class_source(mut self, class_source: impl Into<String>) -> Self {
        self.class_source = Some(class_source.into());
        self
    }

    pub fn with_method_source(mut self, method: MethodDescriptor) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_single_result(
        mut self,
        single_result: impl FnOnce() -> Result<Option<T>> + Send + 'static,
    ) -> Self {
        self.single_result = Some(Box::new(single_result));
        self
    }

    pub fn with_result(
        mut self,
        result: impl FnOnce() -> Result<ResultStream<T>> + Send + 'static,
    ) -> Self {
        self.result = Some(Box::new(result));
        self
    }

    pub fn with_pagination(mut self, pagination: Option<Pageable>) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_single_result_pagination(
        mut self,
        f: impl FnOnce(&Pageable) -> Result<Option<T>> + Send + 'static,
    ) -> Self {
        self.single_result_pagination = Some(Box::new(f));
        self
    }

    pub fn with_stream_pagination(
        mut self,
        f: impl FnOnce(&Pageable) -> Result<ResultStream<T>> + Send + 'static,
    ) -> Self {
        self.stream_pagination = Some(Box::new(f));
        self
    }

    pub fn with_page(
        mut self,
        f: impl FnOnce(&Pageable) -> Result<Page<T>> + Send + 'static,
    ) -> Self {
        self.page = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<DynamicReturn<T>> {
        let class_source = required(self.class_source, "the class Source")?;
        let method = required(self.method, "the method Source")?;
        let single_result = required(self.single_result, "the single result supplier")?;
        let result = required(self.result, "the result supplier")?;

        let pagination = match self.pagination {
            None => None,
            Some(pageable) => Some(Paginated {
                single_result: required(
                    self.single_result_pagination,
                    "the single result pagination function",
                )?,
                stream: required(self.stream_pagination, "the stream pagination function")?,
                page: required(self.page, "the page function")?,
                pageable,
            }),
        };

        Ok(DynamicReturn {
            class_source,
            method,
            single_result,
            result,
            pagination,
        })
    }
}

fn required<V>(value: Option<V>, what: &str) -> Result<V> {
    value.ok_or_else(|| MappingError::null_argument(what))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIND_BY_NAME: MethodDescriptor =
        MethodDescriptor::new("PersonRepository", "find_by_name", ReturnShape::Optional);

    #[test]
    fn test_single_result_from_zero_one_many() {
        let none = to_single_result(FIND_BY_NAME, || Ok(Vec::<i32>::new()));
        assert_eq!(none().unwrap(), None);

        let one = to_single_result(FIND_BY_NAME, || Ok(vec![7]));
        assert_eq!(one().unwrap(), Some(7));

        let many = to_single_result(FIND_BY_NAME, || Ok(vec![1, 2, 3]));
        let err = many().unwrap_err();
        assert!(err.is_non_unique_result());
        assert_eq!(
            err.to_string(),
            "No unique result to the method: PersonRepository::find_by_name"
        );
    }

    #[test]
    fn test_single_result_stops_after_two_elements() {
        let infinite = to_single_result(FIND_BY_NAME, || Ok(0u64..));
        assert!(infinite().unwrap_err().is_non_unique_result());
    }

    #[test]
    fn test_find_pageable_ignores_other_arguments() {
        let name = "Ada".to_string();
        let pageable = Pageable::of(1, 2).unwrap();

        assert_eq!(find_pageable(&[&name, &pageable]), Some(pageable.clone()));
        assert_eq!(find_pageable(&[&name]), None);
        assert!(find_special_parameters(&[]).is_empty());
    }
}
