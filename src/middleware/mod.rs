//! Onion-style middleware
//!
//! Middleware wraps the transport: each one receives the request and a
//! [`Next`] handle, may edit the request, calls `next.run(..)` (or answers on
//! its own), and may edit the response on the way back. For a stack
//! `[a, b]` the order is `a` before, `b` before, transport, `b` after,
//! `a` after.
//!
//! A stack is installed as the operation's transport through
//! [`MiddlewareTransport`], so it runs between the `before_transmit` and
//! `after_transmit` interceptor hooks of every attempt.

mod named;
pub mod presets;

use std::sync::Arc;

use async_trait::async_trait;

use crate::attributes::Attributes;
use crate::error::{BoxError, TransportError};
use crate::operation::Operation;
use crate::transport::{SharedTransport, TransportExecutor};

pub use named::{MiddlewareStack, NamedMiddleware};

/// Request/response transformer around the next handler.
#[async_trait]
pub trait Middleware<Op: Operation>: Send + Sync {
    async fn handle(
        &self,
        request: Op::Request,
        attributes: &Attributes,
        next: Next<'_, Op>,
    ) -> Result<Op::Response, BoxError>;
}

/// The rest of the chain, ending in the transport.
pub struct Next<'a, Op: Operation> {
    middleware: &'a [NamedMiddleware<Op>],
    transport: &'a dyn TransportExecutor<Op>,
}

impl<'a, Op: Operation> Next<'a, Op> {
    pub fn new(
        middleware: &'a [NamedMiddleware<Op>],
        transport: &'a dyn TransportExecutor<Op>,
    ) -> Self {
        Self {
            middleware,
            transport,
        }
    }

    /// Pass the request on to the next middleware, or to the transport.
    pub async fn run(
        self,
        request: Op::Request,
        attributes: &Attributes,
    ) -> Result<Op::Response, BoxError> {
        match self.middleware.split_first() {
            Some((current, rest)) => {
                tracing::trace!(
                    target: "siumai::runtime",
                    middleware = %current.name,
                    "entering middleware"
                );
                let next = Next::new(rest, self.transport);
                current.middleware.handle(request, attributes, next).await
            }
            None => self
                .transport
                .execute(request, attributes)
                .await
                .map_err(BoxError::from),
        }
    }
}

/// Transport executor that runs a middleware stack around another executor.
///
/// Errors from the stack become transport errors; a [`TransportError`]
/// returned anywhere in the stack keeps its kind.
pub struct MiddlewareTransport<Op: Operation> {
    middleware: Arc<[NamedMiddleware<Op>]>,
    transport: SharedTransport<Op>,
}

impl<Op: Operation> MiddlewareTransport<Op> {
    pub fn new(stack: MiddlewareStack<Op>, transport: SharedTransport<Op>) -> Self {
        Self {
            middleware: stack.into_vec().into(),
            transport,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name.as_str()).collect()
    }
}

impl<Op: Operation> Clone for MiddlewareTransport<Op> {
    fn clone(&self) -> Self {
        Self {
            middleware: self.middleware.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<Op: Operation> std::fmt::Debug for MiddlewareTransport<Op> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareTransport")
            .field("middleware", &self.names())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<Op: Operation> TransportExecutor<Op> for MiddlewareTransport<Op> {
    async fn execute(
        &self,
        request: Op::Request,
        attributes: &Attributes,
    ) -> Result<Op::Response, TransportError> {
        Next::new(&self.middleware, self.transport.as_ref())
            .run(request, attributes)
            .await
            .map_err(TransportError::from_boxed)
    }
}
