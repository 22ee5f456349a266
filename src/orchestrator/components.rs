//! Serialization and deserialization components

use std::fmt;

use async_trait::async_trait;

use crate::attributes::Attributes;
use crate::error::{BoxError, ResponseError};
use crate::operation::{Operation, RequestBuilderOf};

/// One step of request serialization.
///
/// All registered steps run in registration order against the same builder,
/// so independently generated steps (path, headers, body) compose without
/// knowing about each other.
pub trait SerializeStep<Op: Operation>: Send + Sync {
    fn serialize(
        &self,
        input: &Op::Input,
        builder: &mut RequestBuilderOf<Op>,
        attributes: &mut Attributes,
    ) -> Result<(), BoxError>;
}

/// [`SerializeStep`] backed by a closure.
pub struct FnSerializeStep<F> {
    f: F,
}

impl<F> FnSerializeStep<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnSerializeStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSerializeStep")
    }
}

impl<Op, F> SerializeStep<Op> for FnSerializeStep<F>
where
    Op: Operation,
    F: Fn(&Op::Input, &mut RequestBuilderOf<Op>, &mut Attributes) -> Result<(), BoxError>
        + Send
        + Sync,
{
    fn serialize(
        &self,
        input: &Op::Input,
        builder: &mut RequestBuilderOf<Op>,
        attributes: &mut Attributes,
    ) -> Result<(), BoxError> {
        (self.f)(input, builder, attributes)
    }
}

/// Turns a response into the typed output or a classified error.
///
/// Ordinary service failures are returned as [`ResponseError::Service`],
/// never as a panic or a transport error.
#[async_trait]
pub trait Deserializer<Op: Operation>: Send + Sync {
    async fn deserialize(
        &self,
        response: &Op::Response,
        attributes: &Attributes,
    ) -> Result<Op::Output, ResponseError>;
}

/// [`Deserializer`] backed by a synchronous closure.
pub struct FnDeserializer<F> {
    f: F,
}

impl<F> FnDeserializer<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnDeserializer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnDeserializer")
    }
}

#[async_trait]
impl<Op, F> Deserializer<Op> for FnDeserializer<F>
where
    Op: Operation,
    F: Fn(&Op::Response, &Attributes) -> Result<Op::Output, ResponseError> + Send + Sync,
{
    async fn deserialize(
        &self,
        response: &Op::Response,
        attributes: &Attributes,
    ) -> Result<Op::Output, ResponseError> {
        (self.f)(response, attributes)
    }
}
