//! Operation type bundle
//!
//! The engine is generic over five types (input, output, request, response and
//! the attributes bag). Instead of threading four type parameters through
//! every component, each operation names them once on an [`Operation`] type and
//! the engine is parameterized over that single type.

use std::fmt;
use std::marker::PhantomData;

use crate::error::SdkError;
use crate::http::{HttpRequest, HttpResponse, Request, Response};

/// Bundle of the types one operation is executed over.
pub trait Operation: Send + Sync + 'static {
    /// Caller-facing typed input.
    type Input: Send + Sync + 'static;
    /// Typed output produced by the deserializer.
    type Output: Send + Sync + 'static;
    /// Transport-level request message.
    type Request: Request;
    /// Transport-level response message.
    type Response: Response;
}

/// Terminal result of an operation.
pub type OperationResult<Op> =
    Result<<Op as Operation>::Output, SdkError<<Op as Operation>::Response>>;

/// Request builder type of an operation.
pub type RequestBuilderOf<Op> = <<Op as Operation>::Request as Request>::Builder;

/// Marker operation for HTTP services using [`HttpRequest`] and [`HttpResponse`].
pub struct HttpOperation<I, O> {
    _marker: PhantomData<fn() -> (I, O)>,
}

impl<I, O> Operation for HttpOperation<I, O>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    type Input = I;
    type Output = O;
    type Request = HttpRequest;
    type Response = HttpResponse;
}

impl<I, O> fmt::Debug for HttpOperation<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpOperation")
            .field("input", &std::any::type_name::<I>())
            .field("output", &std::any::type_name::<O>())
            .finish()
    }
}
