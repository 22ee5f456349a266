//! Endpoint application
//!
//! Serializers produce requests with a path relative to the service; the
//! endpoint applier fills in where the request goes.

use async_trait::async_trait;
use reqwest::Url;

use crate::attributes::Attributes;
use crate::auth::SelectedAuthScheme;
use crate::error::{BoxError, BuildError};
use crate::http::{HttpRequest, Request, RequestBuilder};
use crate::operation::Operation;

/// Points a request at its resolved endpoint.
#[async_trait]
pub trait EndpointApplier<Op: Operation>: Send + Sync {
    async fn apply(
        &self,
        request: Op::Request,
        scheme: &SelectedAuthScheme,
        attributes: &Attributes,
    ) -> Result<Op::Request, BoxError>;
}

/// Leaves the request as serialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEndpoint;

#[async_trait]
impl<Op: Operation> EndpointApplier<Op> for NoEndpoint {
    async fn apply(
        &self,
        request: Op::Request,
        _scheme: &SelectedAuthScheme,
        _attributes: &Attributes,
    ) -> Result<Op::Request, BoxError> {
        Ok(request)
    }
}

/// A fixed base URL. Its path is prefixed to the request path.
#[derive(Debug, Clone)]
pub struct StaticEndpoint {
    scheme: String,
    host: String,
    port: Option<u16>,
    base_path: String,
}

impl StaticEndpoint {
    pub fn parse(url: &str) -> Result<Self, BuildError> {
        let parsed = Url::parse(url)
            .map_err(|e| BuildError::InvalidConfig(format!("invalid endpoint '{url}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| BuildError::InvalidConfig(format!("endpoint '{url}' has no host")))?;
        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host: host.to_string(),
            port: parsed.port(),
            base_path: parsed.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl<Op> EndpointApplier<Op> for StaticEndpoint
where
    Op: Operation<Request = HttpRequest>,
{
    async fn apply(
        &self,
        request: Op::Request,
        _scheme: &SelectedAuthScheme,
        _attributes: &Attributes,
    ) -> Result<Op::Request, BoxError> {
        let mut builder = request.to_builder();
        let path = format!(
            "{}/{}",
            self.base_path,
            builder.path().trim_start_matches('/')
        );
        builder
            .set_scheme(self.scheme.clone())
            .set_host(self.host.clone())
            .set_port(self.port)
            .set_path(path);
        Ok(builder.build())
    }
}
