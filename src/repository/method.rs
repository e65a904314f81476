use std::fmt;

/// The result shape a repository method declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// A single entity, absent when nothing matched.
    Instance,
    Optional,
    List,
    Stream,
    Page,
}

impl ReturnShape {
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Instance | Self::Optional)
    }
}

/// Compile-time description of one repository method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub repository: &'static str,
    pub name: &'static str,
    pub returns: ReturnShape,
}

impl MethodDescriptor {
    pub const fn new(repository: &'static str, name: &'static str, returns: ReturnShape) -> Self {
        Self {
            repository,
            name,
            returns,
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.repository, self.name)
    }
}
