//! Collection kinds and the supplier registry used when rebuilding
//! embeddable collections from records.

use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::fmt;
use std::hash::Hash;

use super::accessor::AnyBox;
use super::metadata::Mapped;
use crate::core::{MappingError, Result};

/// The declared shape of a collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Deque,
    Queue,
    Set,
    SortedSet,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Deque => "double-ended queue",
            Self::Queue => "queue",
            Self::Set => "set",
            Self::SortedSet => "sorted set",
        };
        write!(f, "{}", name)
    }
}

/// A standard collection whose elements are mapped types.
pub trait EmbeddableCollection: Default + Send + 'static {
    type Element: Mapped;

    const KIND: CollectionKind;

    /// Elements in iteration order.
    fn elements(&self) -> Vec<&Self::Element>;

    fn append(&mut self, element: Self::Element);
}

impl<E: Mapped> EmbeddableCollection for Vec<E> {
    type Element = E;
    const KIND: CollectionKind = CollectionKind::List;

    fn elements(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn append(&mut self, element: E) {
        self.push(element);
    }
}

impl<E: Mapped> EmbeddableCollection for VecDeque<E> {
    type Element = E;
    const KIND: CollectionKind = CollectionKind::Deque;

    fn elements(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn append(&mut self, element: E) {
        self.push_back(element);
    }
}

impl<E: Mapped> EmbeddableCollection for LinkedList<E> {
    type Element = E;
    const KIND: CollectionKind = CollectionKind::Queue;

    fn elements(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn append(&mut self, element: E) {
        self.push_back(element);
    }
}

impl<E: Mapped + Hash + Eq> EmbeddableCollection for HashSet<E> {
    type Element = E;
    const KIND: CollectionKind = CollectionKind::Set;

    fn elements(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn append(&mut self, element: E) {
        self.insert(element);
    }
}

impl<E: Mapped + Ord> EmbeddableCollection for BTreeSet<E> {
    type Element = E;
    const KIND: CollectionKind = CollectionKind::SortedSet;

    fn elements(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn append(&mut self, element: E) {
        self.insert(element);
    }
}

/// The collection a supplier hands out when a COLLECTION field is read.
///
/// Decoded elements are added in record order. The declared collection is
/// then filled from `into_elements`, in the order returned, so a supplier
/// decides which elements reach the field and in what order.
pub trait ErasedCollection: Send {
    fn add(&mut self, element: AnyBox);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> CollectionKind;

    fn into_elements(self: Box<Self>) -> Vec<AnyBox>;
}

/// Keeps elements in arrival order.
pub struct StagedCollection {
    kind: CollectionKind,
    elements: Vec<AnyBox>,
}

impl StagedCollection {
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
        }
    }
}

impl ErasedCollection for StagedCollection {
    fn add(&mut self, element: AnyBox) {
        self.elements.push(element);
    }

    fn len(&self) -> usize {
        self.elements.len()
    }

    fn kind(&self) -> CollectionKind {
        self.kind
    }

    fn into_elements(self: Box<Self>) -> Vec<AnyBox> {
        self.elements
    }
}

/// Builds empty collections for the declared kinds it accepts.
pub trait CollectionSupplier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether a field declared with `kind` belongs to this supplier.
    fn test(&self, kind: CollectionKind) -> bool;

    /// A new empty collection for a field declared with `kind`.
    fn get(&self, kind: CollectionKind) -> Box<dyn ErasedCollection>;
}

pub struct ListSupplier;

impl CollectionSupplier for ListSupplier {
    fn name(&self) -> &'static str {
        "list"
    }

    fn test(&self, kind: CollectionKind) -> bool {
        kind == CollectionKind::List
    }

    fn get(&self, kind: CollectionKind) -> Box<dyn ErasedCollection> {
        Box::new(StagedCollection::new(kind))
    }
}

pub struct DequeSupplier;

impl CollectionSupplier for DequeSupplier {
    fn name(&self) -> &'static str {
        "deque"
    }

    fn test(&self, kind: CollectionKind) -> bool {
        matches!(kind, CollectionKind::Deque | CollectionKind::Queue)
    }

    fn get(&self, kind: CollectionKind) -> Box<dyn ErasedCollection> {
        Box::new(StagedCollection::new(kind))
    }
}

pub struct SetSupplier;

impl CollectionSupplier for SetSupplier {
    fn name(&self) -> &'static str {
        "set"
    }

    fn test(&self, kind: CollectionKind) -> bool {
        kind == CollectionKind::Set
    }

    fn get(&self, kind: CollectionKind) -> Box<dyn ErasedCollection> {
        Box::new(StagedCollection::new(kind))
    }
}

pub struct TreeSetSupplier;

impl CollectionSupplier for TreeSetSupplier {
    fn name(&self) -> &'static str {
        "tree set"
    }

    fn test(&self, kind: CollectionKind) -> bool {
        kind == CollectionKind::SortedSet
    }

    fn get(&self, kind: CollectionKind) -> Box<dyn ErasedCollection> {
        Box::new(StagedCollection::new(kind))
    }
}

/// Registry of collection suppliers. The most recently registered supplier
/// that accepts a kind wins.
pub struct CollectionSuppliers {
    suppliers: Vec<Box<dyn CollectionSupplier>>,
}

impl CollectionSuppliers {
    pub fn new() -> Self {
        Self {
            suppliers: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(Box::new(ListSupplier));
        registry.register(Box::new(DequeSupplier));
        registry.register(Box::new(SetSupplier));
        registry.register(Box::new(TreeSetSupplier));

        registry
    }

    pub fn register(&mut self, supplier: Box<dyn CollectionSupplier>) {
        self.suppliers.push(supplier);
    }

    pub fn find(&self, kind: CollectionKind) -> Result<&dyn CollectionSupplier> {
        self.suppliers
            .iter()
            .rev()
            .find(|s| s.test(kind))
            .map(|s| s.as_ref())
            .ok_or_else(|| MappingError::UnsupportedCollection(kind.to_string()))
    }

    /// A new empty collection for a field declared with `kind`.
    pub fn get(&self, kind: CollectionKind) -> Result<Box<dyn ErasedCollection>> {
        Ok(self.find(kind)?.get(kind))
    }

    pub fn list_suppliers(&self) -> Vec<&str> {
        self.suppliers.iter().map(|s| s.name()).collect()
    }
}

impl Default for CollectionSuppliers {
    fn default() -> Self {
        Self::with_defaults()
    }
}
