//! Request signers and token providers

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use super::SelectedAuthScheme;
use crate::attributes::Attributes;
use crate::error::BoxError;
use crate::http::Request;
use crate::operation::Operation;

/// Applies credentials to a request for the selected scheme.
#[async_trait]
pub trait Signer<Op: Operation>: Send + Sync {
    async fn sign(
        &self,
        request: Op::Request,
        scheme: &SelectedAuthScheme,
        attributes: &Attributes,
    ) -> Result<Op::Request, BoxError>;
}

/// Leaves the request unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthSigner;

#[async_trait]
impl<Op: Operation> Signer<Op> for NoAuthSigner {
    async fn sign(
        &self,
        request: Op::Request,
        _scheme: &SelectedAuthScheme,
        _attributes: &Attributes,
    ) -> Result<Op::Request, BoxError> {
        Ok(request)
    }
}

/// Supplies bearer tokens.
///
/// Implementations may cache and refresh tokens internally.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Result<SecretString, BoxError>;
}

/// A fixed token, for tests and tokens managed outside the client.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> Result<SecretString, BoxError> {
        Ok(self.token.clone())
    }
}

/// Sets `Authorization: Bearer <token>`; the header value is marked sensitive.
#[derive(Clone)]
pub struct BearerTokenSigner {
    provider: Arc<dyn TokenProvider>,
}

impl BearerTokenSigner {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }

    pub fn from_static(token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticTokenProvider::new(token)))
    }
}

impl fmt::Debug for BearerTokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenSigner").finish_non_exhaustive()
    }
}

#[async_trait]
impl<Op: Operation> Signer<Op> for BearerTokenSigner {
    async fn sign(
        &self,
        mut request: Op::Request,
        _scheme: &SelectedAuthScheme,
        _attributes: &Attributes,
    ) -> Result<Op::Request, BoxError> {
        let token = self.provider.token()?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HTTP_BEARER_AUTH_SCHEME_ID;
    use crate::http::{HttpRequest, RequestBuilder};
    use crate::operation::HttpOperation;

    type TestOp = HttpOperation<(), ()>;

    #[tokio::test]
    async fn bearer_signer_sets_sensitive_header() {
        let signer = BearerTokenSigner::from_static("secret-token");
        let scheme = SelectedAuthScheme::new(HTTP_BEARER_AUTH_SCHEME_ID);

        let request = Signer::<TestOp>::sign(
            &signer,
            HttpRequest::builder().build(),
            &scheme,
            &Attributes::new(),
        )
        .await
        .unwrap();

        let header = request.headers().get(AUTHORIZATION).unwrap();
        assert_eq!(header.to_str().unwrap(), "Bearer secret-token");
        assert!(header.is_sensitive());
        assert!(!format!("{signer:?}").contains("secret-token"));
    }

    #[tokio::test]
    async fn invalid_token_is_an_error() {
        let signer = BearerTokenSigner::from_static("bad\ntoken");
        let result = Signer::<TestOp>::sign(
            &signer,
            HttpRequest::builder().build(),
            &SelectedAuthScheme::new(HTTP_BEARER_AUTH_SCHEME_ID),
            &Attributes::new(),
        )
        .await;
        assert!(result.is_err());
    }
}
