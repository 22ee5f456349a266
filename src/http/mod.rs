//! Message abstractions
//!
//! The orchestrator manipulates requests and responses only through the
//! capability traits defined here:
//! - **Request** / **RequestBuilder**: headers, body, copy-to-builder
//! - **Response** / **ResponseBuilder**: status, headers, body, copy-to-builder
//!
//! `HttpRequest` and `HttpResponse` are the concrete HTTP implementations used by
//! [`HttpOperation`](crate::operation::HttpOperation).

pub mod body;
pub mod headers;
pub mod request;
pub mod response;

use std::fmt;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

pub use body::{Body, ByteStream, StreamSource};
pub use headers::{InvalidHeader, header_str, insert_header, parse_header};
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, HttpResponseBuilder};

/// Capability set the engine needs from a request message.
///
/// Requests are plain owned values: the orchestrator hands each attempt its own
/// copy, so in-place mutation through `headers_mut`/`set_body` never reaches a
/// message that a previous attempt transmitted.
pub trait Request: Clone + fmt::Debug + Send + Sync + 'static {
    type Builder: RequestBuilder<Request = Self>;

    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn body(&self) -> &Body;
    fn set_body(&mut self, body: Body);

    /// Copy this request into a fresh mutable builder.
    fn to_builder(&self) -> Self::Builder;
}

/// Mutable accumulator for a request; serialization starts from `Default`.
pub trait RequestBuilder: Default + Send + Sync + 'static {
    type Request: Request;

    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn body(&self) -> &Body;
    fn set_body(&mut self, body: Body);
    fn build(self) -> Self::Request;
}

/// Capability set the engine needs from a response message.
pub trait Response: Clone + fmt::Debug + Send + Sync + 'static {
    type Builder: ResponseBuilder<Response = Self>;

    fn status(&self) -> StatusCode;
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn body(&self) -> &Body;
    fn set_body(&mut self, body: Body);

    /// Copy this response into a fresh mutable builder.
    fn to_builder(&self) -> Self::Builder;
}

/// Mutable accumulator for a response.
pub trait ResponseBuilder: Default + Send + Sync + 'static {
    type Response: Response;

    fn status(&self) -> StatusCode;
    fn set_status(&mut self, status: StatusCode);
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn set_body(&mut self, body: Body);
    fn build(self) -> Self::Response;
}
