//! Concrete HTTP response message

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use super::{Body, Response, ResponseBuilder};

/// HTTP response as seen by deserializers and interceptors.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn builder() -> HttpResponseBuilder {
        HttpResponseBuilder::default()
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

impl Response for HttpResponse {
    type Builder = HttpResponseBuilder;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    fn to_builder(&self) -> HttpResponseBuilder {
        HttpResponseBuilder {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Builder for [`HttpResponse`].
#[derive(Debug, Clone, Default)]
pub struct HttpResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl ResponseBuilder for HttpResponseBuilder {
    type Response = HttpResponse;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    fn build(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn builder_copy_is_independent() {
        let original = HttpResponse::new(StatusCode::OK, "{}");
        let mut builder = original.to_builder();
        builder.set_status(StatusCode::ACCEPTED);
        builder
            .headers_mut()
            .insert("x-rewritten", HeaderValue::from_static("true"));
        let rewritten = builder.build();

        assert_eq!(original.status(), StatusCode::OK);
        assert!(original.headers().is_empty());
        assert_eq!(rewritten.status(), StatusCode::ACCEPTED);
        assert_eq!(rewritten.body().as_bytes(), Some(&b"{}"[..]));
    }
}
