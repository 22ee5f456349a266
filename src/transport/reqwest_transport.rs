//! Transport executor backed by `reqwest`

use std::time::Duration;

use async_trait::async_trait;

use super::TransportExecutor;
use crate::attributes::Attributes;
use crate::error::TransportError;
use crate::http::{Body, HttpRequest, HttpResponse, Request};
use crate::operation::Operation;

/// Sends [`HttpRequest`]s with a shared `reqwest::Client`.
///
/// Streaming request bodies are buffered before sending; response bodies are
/// read fully into memory.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Per-request timeout covering connect, send and body read.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url().map_err(TransportError::other)?;
        let mut builder = self
            .client
            .request(request.method().clone(), url.clone())
            .headers(request.headers().clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match request.body() {
            Body::Empty => builder,
            Body::Bytes(bytes) => builder.body(bytes.clone()),
            Body::Stream(_) => {
                builder.body(request.body().collect().await.map_err(TransportError::io)?)
            }
        };

        tracing::debug!(
            target: "siumai::runtime",
            method = %request.method(),
            url = %url,
            "sending http request"
        );
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        tracing::debug!(
            target: "siumai::runtime",
            status = status.as_u16(),
            bytes = body.len(),
            "http response received"
        );

        Ok(HttpResponse::new(status, body).with_headers(headers))
    }
}

#[async_trait]
impl<Op> TransportExecutor<Op> for ReqwestTransport
where
    Op: Operation<Request = HttpRequest, Response = HttpResponse>,
{
    async fn execute(
        &self,
        request: Op::Request,
        _attributes: &Attributes,
    ) -> Result<Op::Response, TransportError> {
        self.send(request).await
    }
}
