//! Auth scheme selection and signing
//!
//! Each attempt selects one auth scheme, then runs the signer registered for
//! that scheme's id. When the selector has no preference the attempt runs
//! with [`NO_AUTH_SCHEME_ID`].

mod signer;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use async_trait::async_trait;

use crate::attributes::Attributes;
use crate::error::BoxError;
use crate::operation::Operation;

pub use signer::{BearerTokenSigner, NoAuthSigner, Signer, StaticTokenProvider, TokenProvider};

/// Identifier of an auth scheme, e.g. `http-bearer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthSchemeId(Cow<'static, str>);

impl AuthSchemeId {
    pub const fn new(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AuthSchemeId {
    fn from(id: String) -> Self {
        Self(Cow::Owned(id))
    }
}

impl From<&'static str> for AuthSchemeId {
    fn from(id: &'static str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for AuthSchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anonymous requests.
pub const NO_AUTH_SCHEME_ID: AuthSchemeId = AuthSchemeId::new("no-auth");
/// `Authorization: Bearer <token>`.
pub const HTTP_BEARER_AUTH_SCHEME_ID: AuthSchemeId = AuthSchemeId::new("http-bearer");

/// Scheme chosen for one attempt, with properties for the endpoint applier
/// and signer (e.g. a signing region).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAuthScheme {
    scheme_id: AuthSchemeId,
    properties: BTreeMap<String, String>,
}

impl SelectedAuthScheme {
    pub fn new(scheme_id: AuthSchemeId) -> Self {
        Self {
            scheme_id,
            properties: BTreeMap::new(),
        }
    }

    pub fn no_auth() -> Self {
        Self::new(NO_AUTH_SCHEME_ID)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn scheme_id(&self) -> &AuthSchemeId {
        &self.scheme_id
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Chooses the auth scheme for an attempt.
#[async_trait]
pub trait AuthSchemeSelector<Op: Operation>: Send + Sync {
    /// `Ok(None)` means no scheme qualifies and the request goes unauthenticated.
    async fn select(
        &self,
        input: &Op::Input,
        attributes: &Attributes,
    ) -> Result<Option<SelectedAuthScheme>, BoxError>;
}

/// Always selects nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthSchemeSelector;

#[async_trait]
impl<Op: Operation> AuthSchemeSelector<Op> for NoAuthSchemeSelector {
    async fn select(
        &self,
        _input: &Op::Input,
        _attributes: &Attributes,
    ) -> Result<Option<SelectedAuthScheme>, BoxError> {
        Ok(None)
    }
}

/// Picks the first candidate, in preference order, whose scheme the client
/// supports (i.e. has an identity and signer for).
#[derive(Debug, Clone, Default)]
pub struct CandidateAuthSchemeSelector {
    candidates: Vec<SelectedAuthScheme>,
    supported: HashSet<AuthSchemeId>,
}

impl CandidateAuthSchemeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidate(mut self, scheme: SelectedAuthScheme) -> Self {
        self.candidates.push(scheme);
        self
    }

    pub fn with_supported(mut self, scheme_id: AuthSchemeId) -> Self {
        self.supported.insert(scheme_id);
        self
    }
}

#[async_trait]
impl<Op: Operation> AuthSchemeSelector<Op> for CandidateAuthSchemeSelector {
    async fn select(
        &self,
        _input: &Op::Input,
        _attributes: &Attributes,
    ) -> Result<Option<SelectedAuthScheme>, BoxError> {
        Ok(self
            .candidates
            .iter()
            .find(|candidate| self.supported.contains(candidate.scheme_id()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::HttpOperation;

    type TestOp = HttpOperation<(), ()>;

    #[tokio::test]
    async fn candidate_selector_honours_preference_order() {
        let sigv4 = SelectedAuthScheme::new(AuthSchemeId::new("sigv4"))
            .with_property("region", "eu-west-1");
        let bearer = SelectedAuthScheme::new(HTTP_BEARER_AUTH_SCHEME_ID);
        let selector = CandidateAuthSchemeSelector::new()
            .with_candidate(sigv4)
            .with_candidate(bearer.clone())
            .with_supported(HTTP_BEARER_AUTH_SCHEME_ID);

        let selected = AuthSchemeSelector::<TestOp>::select(&selector, &(), &Attributes::new())
            .await
            .unwrap();
        assert_eq!(selected, Some(bearer));
    }

    #[tokio::test]
    async fn nothing_supported_selects_none() {
        let selector = CandidateAuthSchemeSelector::new()
            .with_candidate(SelectedAuthScheme::new(HTTP_BEARER_AUTH_SCHEME_ID));
        let selected = AuthSchemeSelector::<TestOp>::select(&selector, &(), &Attributes::new())
            .await
            .unwrap();
        assert!(selected.is_none());
    }

    #[test]
    fn scheme_properties() {
        let scheme = SelectedAuthScheme::no_auth().with_property("region", "us-east-1");
        assert_eq!(scheme.scheme_id(), &NO_AUTH_SCHEME_ID);
        assert_eq!(scheme.property("region"), Some("us-east-1"));
        assert_eq!(scheme.property("missing"), None);
    }
}
