//! Concrete HTTP request message

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};

use super::{Body, Request, RequestBuilder};
use crate::error::BoxError;

/// HTTP request whose endpoint (scheme/host/port) may still be unresolved.
///
/// Serializers usually fill in method, path, query, headers and body; the
/// endpoint applier later supplies scheme, host and port.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Body,
}

impl HttpRequest {
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Absolute URL including the encoded query string.
    pub fn url(&self) -> Result<Url, BoxError> {
        if self.host.is_empty() {
            return Err("request has no host; apply an endpoint first".into());
        }
        let authority = match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        let mut url = Url::parse(&format!("{}://{}{}", self.scheme, authority, path))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

impl Request for HttpRequest {
    type Builder = HttpRequestBuilder;

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

    fn to_builder(&self) -> HttpRequestBuilder {
        HttpRequestBuilder {
            method: self.method.clone(),
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            path: self.path.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Builder for [`HttpRequest`].
#[derive(Debug, Clone)]
pub struct HttpRequestBuilder {
    method: Method,
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Body,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            scheme: "https".to_string(),
            host: String::new(),
            port: None,
            path: "/".to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }
}

impl HttpRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    pub fn set_scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.scheme = scheme.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = host.into();
        self
    }

    pub fn set_port(&mut self, port: Option<u16>) -> &mut Self {
        self.port = port;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = path.into();
        self
    }

    /// Append a query parameter; duplicates are kept in order.
    pub fn push_query(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }
}

impl RequestBuilder for HttpRequestBuilder {
    type Request = HttpRequest;

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

    fn build(self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            scheme: self.scheme,
            host: self.host,
            port: self.port,
            path: self.path,
            query: self.query,
            headers: self.headers,
            body: self.body,
        }
    }
}
