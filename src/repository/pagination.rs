use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{MappingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub property: String,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        write!(f, "{} {}", self.property, direction)
    }
}

/// Page request: 1-based page number and a positive page size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pageable {
    page: u64,
    size: u64,
    sorts: Vec<Sort>,
}

impl Pageable {
    pub fn of(page: u64, size: u64) -> Result<Self> {
        if page == 0 {
            return Err(MappingError::InvalidArgument(
                "page number starts at 1".to_string(),
            ));
        }
        if size == 0 {
            return Err(MappingError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }
        if (page - 1).checked_mul(size).is_none() {
            return Err(MappingError::InvalidArgument(format!(
                "page {} of size {} is out of range",
                page, size
            )));
        }
        Ok(Self {
            page,
            size,
            sorts: Vec::new(),
        })
    }

    pub fn sort_by(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    /// Number of elements before this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            size: self.size,
            sorts: self.sorts.clone(),
        }
    }
}

/// Result window: 1-based first position and the maximum number of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Limit {
    pub start: u64,
    pub max_results: u64,
}

impl Limit {
    pub fn of(max_results: u64) -> Self {
        Self {
            start: 1,
            max_results,
        }
    }

    pub fn range(start: u64, end: u64) -> Result<Self> {
        if start == 0 || end < start {
            return Err(MappingError::InvalidArgument(format!(
                "invalid limit range {}..={}",
                start, end
            )));
        }
        Ok(Self {
            start,
            max_results: end - start + 1,
        })
    }
}

/// One page of results and the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    pageable: Pageable,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: Pageable) -> Self {
        Self { content, pageable }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn pageable(&self) -> &Pageable {
        &self.pageable
    }

    pub fn next_pageable(&self) -> Pageable {
        self.pageable.next()
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            pageable: self.pageable,
        }
    }
}

/// Pagination, sorting and limit arguments found in a repository call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecialParameters {
    pub pageable: Option<Pageable>,
    pub sorts: Vec<Sort>,
    pub limit: Option<Limit>,
}

impl SpecialParameters {
    pub fn of(params: &[&dyn Any]) -> Self {
        let mut special = Self::default();
        for param in params {
            if let Some(pageable) = param.downcast_ref::<Pageable>() {
                special.pageable.get_or_insert_with(|| pageable.clone());
            } else if let Some(sort) = param.downcast_ref::<Sort>() {
                special.sorts.push(sort.clone());
            } else if let Some(sorts) = param.downcast_ref::<Vec<Sort>>() {
                special.sorts.extend(sorts.iter().cloned());
            } else if let Some(limit) = param.downcast_ref::<Limit>() {
                special.limit.get_or_insert(*limit);
            }
        }
        special
    }

    pub fn is_empty(&self) -> bool {
        self.pageable.is_none() && self.sorts.is_empty() && self.limit.is_none()
    }

    pub fn has_only_sort(&self) -> bool {
        self.pageable.is_none() && self.limit.is_none() && !self.sorts.is_empty()
    }

    /// Sorts from the page request first, then the standalone ones.
    pub fn all_sorts(&self) -> Vec<Sort> {
        self.pageable
            .iter()
            .flat_map(|p| p.sorts().iter().cloned())
            .chain(self.sorts.iter().cloned())
            .collect()
    }
}
