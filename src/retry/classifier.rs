//! Retry classification
//!
//! Classifiers turn a failed attempt into an [`ErrorInfo`]. They run in
//! order and the first one with a verdict wins; when none has one, the error
//! is not retried.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::{ErrorKind, SdkError, TransportErrorKind};
use crate::http::Response;

/// Classified failure handed to the retry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorInfo {
    kind: ErrorKind,
    retry_after: Option<Duration>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            retry_after: None,
        }
    }

    pub fn not_retryable() -> Self {
        Self::new(ErrorKind::NotRetryable)
    }

    /// Attach a server-supplied delay hint.
    pub fn with_retry_after(mut self, delay: Option<Duration>) -> Self {
        self.retry_after = delay;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// One classification rule.
pub trait ClassifyRetry<R: Response>: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` means "no opinion"; the next classifier is asked.
    fn classify(&self, error: &SdkError<R>) -> Option<ErrorInfo>;
}

/// Ordered list of classifiers.
pub struct RetryClassifiers<R: Response> {
    classifiers: Vec<Arc<dyn ClassifyRetry<R>>>,
}

impl<R: Response> Clone for RetryClassifiers<R> {
    fn clone(&self) -> Self {
        Self {
            classifiers: self.classifiers.clone(),
        }
    }
}

impl<R: Response> fmt::Debug for RetryClassifiers<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.classifiers.iter().map(|c| c.name()))
            .finish()
    }
}

impl<R: Response> Default for RetryClassifiers<R> {
    /// Modeled errors, then transport errors, then HTTP status codes.
    fn default() -> Self {
        Self::new()
            .with_classifier(ModeledErrorClassifier)
            .with_classifier(TransportErrorClassifier)
            .with_classifier(HttpStatusCodeClassifier::default())
    }
}

impl<R: Response> RetryClassifiers<R> {
    /// An empty list: every failure is classified as not retryable.
    pub fn new() -> Self {
        Self {
            classifiers: Vec::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl ClassifyRetry<R> + 'static) -> Self {
        self.classifiers.push(Arc::new(classifier));
        self
    }

    pub fn push(&mut self, classifier: Arc<dyn ClassifyRetry<R>>) {
        self.classifiers.push(classifier);
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    pub fn classify(&self, error: &SdkError<R>) -> ErrorInfo {
        match error {
            SdkError::Client { .. } => return ErrorInfo::new(ErrorKind::ClientError),
            SdkError::Interceptor { .. } | SdkError::Cancelled | SdkError::Throttled(_) => {
                return ErrorInfo::not_retryable();
            }
            _ => {}
        }

        self.classifiers
            .iter()
            .find_map(|classifier| classifier.classify(error))
            .unwrap_or_else(ErrorInfo::not_retryable)
    }
}

/// Uses the retry hint a deserializer attached to a modeled service error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeledErrorClassifier;

impl<R: Response> ClassifyRetry<R> for ModeledErrorClassifier {
    fn name(&self) -> &'static str {
        "modeled-error"
    }

    fn classify(&self, error: &SdkError<R>) -> Option<ErrorInfo> {
        match error {
            SdkError::Service {
                kind: Some(kind),
                response,
                ..
            } => Some(
                ErrorInfo::new(*kind).with_retry_after(parse_retry_after(response.headers())),
            ),
            _ => None,
        }
    }
}

/// Treats timeouts and connection failures as transient.
///
/// Transport errors of kind `Other` (e.g. a request without an endpoint, or a
/// middleware rejection) get no verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportErrorClassifier;

impl<R: Response> ClassifyRetry<R> for TransportErrorClassifier {
    fn name(&self) -> &'static str {
        "transport-error"
    }

    fn classify(&self, error: &SdkError<R>) -> Option<ErrorInfo> {
        match error.transport_error()?.kind() {
            TransportErrorKind::Timeout | TransportErrorKind::Connect | TransportErrorKind::Io => {
                Some(ErrorInfo::new(ErrorKind::TransientError))
            }
            TransportErrorKind::Other => None,
        }
    }
}

/// Classifies by the status code of the received response.
#[derive(Debug, Clone)]
pub struct HttpStatusCodeClassifier {
    rules: Vec<(StatusCode, ErrorKind)>,
}

impl Default for HttpStatusCodeClassifier {
    /// 429 throttling; 500, 502, 503, 504 server; 408 transient.
    fn default() -> Self {
        Self {
            rules: vec![
                (StatusCode::TOO_MANY_REQUESTS, ErrorKind::ThrottlingError),
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::ServerError),
                (StatusCode::BAD_GATEWAY, ErrorKind::ServerError),
                (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::ServerError),
                (StatusCode::GATEWAY_TIMEOUT, ErrorKind::ServerError),
                (StatusCode::REQUEST_TIMEOUT, ErrorKind::TransientError),
            ],
        }
    }
}

impl HttpStatusCodeClassifier {
    /// A classifier with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add or replace the kind for one status code.
    pub fn with_status(mut self, status: StatusCode, kind: ErrorKind) -> Self {
        self.rules.retain(|(code, _)| *code != status);
        self.rules.push((status, kind));
        self
    }
}

impl<R: Response> ClassifyRetry<R> for HttpStatusCodeClassifier {
    fn name(&self) -> &'static str {
        "http-status-code"
    }

    fn classify(&self, error: &SdkError<R>) -> Option<ErrorInfo> {
        let response = error.raw_response()?;
        let status = response.status();
        self.rules
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, kind)| {
                ErrorInfo::new(*kind).with_retry_after(parse_retry_after(response.headers()))
            })
    }
}

/// Parse a `Retry-After` header given in delta-seconds.
///
/// HTTP-date values are ignored and the computed backoff applies.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(seconds))
}
