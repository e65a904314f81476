//! Positional instantiation of entities that are built through a constructor.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

use tracing::{Level, event};

use super::accessor::{AnyBox, downcast_box};
use super::metadata::{EntityMetadata, Mapped};
use crate::core::{MappingError, Result};

/// Arguments handed to a constructor function, in declaration order.
pub struct ConstructorArgs {
    names: VecDeque<&'static str>,
    values: VecDeque<Option<AnyBox>>,
}

impl ConstructorArgs {
    fn new(names: &[&'static str], values: Vec<Option<AnyBox>>) -> Self {
        Self {
            names: names.iter().copied().collect(),
            values: values.into_iter().collect(),
        }
    }

    fn next(&mut self) -> Result<(&'static str, Option<AnyBox>)> {
        match (self.names.pop_front(), self.values.pop_front()) {
            (Some(name), Some(value)) => Ok((name, value)),
            (Some(name), None) => Err(MappingError::MissingArgument(name.to_string())),
            _ => Err(MappingError::InvalidArgument(
                "constructor asked for more arguments than it declares".to_string(),
            )),
        }
    }

    /// Next argument, which must be present.
    pub fn take<X: 'static>(&mut self) -> Result<X> {
        let (name, value) = self.next()?;
        match value {
            Some(value) => downcast_box(value, name),
            None => Err(MappingError::MissingArgument(name.to_string())),
        }
    }

    /// Next argument; an empty placeholder becomes `None`.
    pub fn take_optional<X: 'static>(&mut self) -> Result<Option<X>> {
        let (name, value) = self.next()?;
        value.map(|v| downcast_box(v, name)).transpose()
    }

    pub fn take_or_default<X: Default + 'static>(&mut self) -> Result<X> {
        Ok(self.take_optional()?.unwrap_or_default())
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

pub trait Constructor: Send + Sync {
    fn construct(&self, args: &mut ConstructorArgs) -> Result<AnyBox>;
}

struct TypedConstructor<T> {
    build: fn(&mut ConstructorArgs) -> Result<T>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Mapped> Constructor for TypedConstructor<T> {
    fn construct(&self, args: &mut ConstructorArgs) -> Result<AnyBox> {
        Ok(Box::new((self.build)(args)?))
    }
}

/// The constructor chosen for an entity: its display signature and the
/// field names it takes, in order.
pub struct ConstructorDescriptor {
    signature: String,
    parameters: Vec<&'static str>,
    constructor: Box<dyn Constructor>,
}

impl ConstructorDescriptor {
    pub fn new<T: Mapped>(
        signature: impl Into<String>,
        parameters: Vec<&'static str>,
        build: fn(&mut ConstructorArgs) -> Result<T>,
    ) -> Self {
        Self {
            signature: signature.into(),
            parameters,
            constructor: Box::new(TypedConstructor {
                build,
                _entity: PhantomData,
            }),
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn parameters(&self) -> &[&'static str] {
        &self.parameters
    }

    pub fn is_parameter(&self, field: &str) -> bool {
        self.parameters.contains(&field)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("signature", &self.signature)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Fired right before a constructor is invoked.
#[derive(Debug, Clone)]
pub struct ConstructorEvent {
    pub entity: String,
    pub signature: String,
    pub parameters: Vec<&'static str>,
    /// `false` where an empty placeholder was supplied.
    pub provided: Vec<bool>,
}

pub trait ConstructorListener: Send + Sync {
    fn on_constructor(&self, event: &ConstructorEvent);
}

/// Collects the arguments for one instantiation. `build` consumes the builder.
pub struct ConstructorBuilder<'a> {
    metadata: &'a EntityMetadata,
    descriptor: &'a ConstructorDescriptor,
    values: Vec<Option<AnyBox>>,
    listener: Option<&'a dyn ConstructorListener>,
}

impl<'a> ConstructorBuilder<'a> {
    pub fn of(metadata: &'a EntityMetadata) -> Result<Self> {
        let descriptor = metadata.constructor().ok_or_else(|| {
            MappingError::InvalidArgument(format!(
                "Entity '{}' is not built through a constructor",
                metadata.name()
            ))
        })?;

        Ok(Self {
            metadata,
            descriptor,
            values: Vec::with_capacity(descriptor.parameters.len()),
            listener: None,
        })
    }

    pub fn with_listener(mut self, listener: Option<&'a dyn ConstructorListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn parameters(&self) -> &'a [&'static str] {
        &self.descriptor.parameters
    }

    pub fn add(&mut self, value: AnyBox) {
        self.values.push(Some(value));
    }

    pub fn add_empty_parameter(&mut self) {
        self.values.push(None);
    }

    pub fn build(self) -> Result<AnyBox> {
        let signature = &self.descriptor.signature;
        let expected = self.descriptor.parameters.len();

        if self.values.len() != expected {
            return Err(MappingError::mapping(
                signature.clone(),
                MappingError::InvalidArgument(format!(
                    "expected {} arguments, got {}",
                    expected,
                    self.values.len()
                )),
            ));
        }

        if let Some(listener) = self.listener {
            listener.on_constructor(&ConstructorEvent {
                entity: self.metadata.name().to_string(),
                signature: signature.clone(),
                parameters: self.descriptor.parameters.clone(),
                provided: self.values.iter().map(Option::is_some).collect(),
            });
        }

        event!(Level::TRACE, constructor = %signature, "invoking constructor");

        let mut args = ConstructorArgs::new(&self.descriptor.parameters, self.values);
        let instance = self
            .descriptor
            .constructor
            .construct(&mut args)
            .map_err(|err| MappingError::mapping(signature.clone(), err))?;

        if args.remaining() > 0 {
            return Err(MappingError::mapping(
                signature.clone(),
                MappingError::InvalidArgument(format!(
                    "{} arguments were not consumed",
                    args.remaining()
                )),
            ));
        }

        Ok(instance)
    }
}

impl fmt::Debug for ConstructorBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorBuilder")
            .field("constructor", &self.descriptor.signature)
            .field("arguments", &self.values.len())
            .finish()
    }
}
