//! Ready-made middleware

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, HeaderName, HeaderValue};

use super::{Middleware, Next};
use crate::attributes::Attributes;
use crate::error::BoxError;
use crate::http::{InvalidHeader, Request, parse_header};
use crate::operation::Operation;

/// Sets one header on every request that passes through.
#[derive(Debug, Clone)]
pub struct SetHeaderMiddleware {
    name: HeaderName,
    value: HeaderValue,
    overwrite: bool,
}

impl SetHeaderMiddleware {
    pub fn new(name: &str, value: &str) -> Result<Self, InvalidHeader> {
        let (name, value) = parse_header(name, value)?;
        Ok(Self {
            name,
            value,
            overwrite: true,
        })
    }

    /// Keep a value the request already carries.
    pub fn if_absent(mut self) -> Self {
        self.overwrite = false;
        self
    }
}

#[async_trait]
impl<Op: Operation> Middleware<Op> for SetHeaderMiddleware {
    async fn handle(
        &self,
        mut request: Op::Request,
        attributes: &Attributes,
        next: Next<'_, Op>,
    ) -> Result<Op::Response, BoxError> {
        let headers = request.headers_mut();
        if self.overwrite || !headers.contains_key(&self.name) {
            headers.insert(self.name.clone(), self.value.clone());
        }
        next.run(request, attributes).await
    }
}

/// Sets `content-length` from the body when its length is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentLengthMiddleware;

#[async_trait]
impl<Op: Operation> Middleware<Op> for ContentLengthMiddleware {
    async fn handle(
        &self,
        mut request: Op::Request,
        attributes: &Attributes,
        next: Next<'_, Op>,
    ) -> Result<Op::Response, BoxError> {
        if let Some(length) = request.body().content_length() {
            request
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(length));
        }
        next.run(request, attributes).await
    }
}

/// Middleware that edits the request with a closure before passing it on.
pub struct MapRequest<F> {
    f: F,
}

impl<F> fmt::Debug for MapRequest<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapRequest")
    }
}

/// Build a [`MapRequest`] middleware from a closure.
///
/// Returning an error short-circuits the chain; the transport is not called.
pub fn map_request<F>(f: F) -> MapRequest<F> {
    MapRequest { f }
}

#[async_trait]
impl<Op, F> Middleware<Op> for MapRequest<F>
where
    Op: Operation,
    F: Fn(&mut Op::Request, &Attributes) -> Result<(), BoxError> + Send + Sync,
{
    async fn handle(
        &self,
        mut request: Op::Request,
        attributes: &Attributes,
        next: Next<'_, Op>,
    ) -> Result<Op::Response, BoxError> {
        (self.f)(&mut request, attributes)?;
        next.run(request, attributes).await
    }
}
