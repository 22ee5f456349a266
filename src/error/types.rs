//! Core error types

use std::fmt;

use crate::interceptor::Hook;
use crate::retry::RetryError;

/// Boxed, thread-safe error used at every pluggable boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Retry-relevant classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller or programmer fault (malformed input, bad credentials). Never retried.
    ClientError,
    /// The peer signalled overload.
    ThrottlingError,
    /// Network failure or timeout below the protocol layer.
    TransientError,
    /// The peer failed while handling a well-formed request (5xx).
    ServerError,
    /// Terminal failure that must not be retried.
    NotRetryable,
}

impl ErrorKind {
    /// Whether a retry strategy may schedule another attempt for this kind.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::ThrottlingError | Self::TransientError | Self::ServerError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ClientError => "client error",
            Self::ThrottlingError => "throttling error",
            Self::TransientError => "transient error",
            Self::ServerError => "server error",
            Self::NotRetryable => "not retryable",
        };
        f.write_str(s)
    }
}

/// Terminal or per-attempt failure of an operation.
///
/// `R` is the operation's response message type; service and unknown failures
/// keep the received response so callers can inspect status and headers.
#[derive(Debug, thiserror::Error)]
pub enum SdkError<R> {
    /// Caller or programmer misuse: serialization failures, invalid headers,
    /// missing identities. Never retried.
    #[error("client error: {message}")]
    Client {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The remote peer answered with a domain-level failure.
    #[error("service error: {source}")]
    Service {
        source: BoxError,
        /// Retry hint supplied by the deserializer, if the error is modeled.
        kind: Option<ErrorKind>,
        response: R,
    },

    /// Network or connection failure below the protocol layer.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An interceptor hook failed; this always terminates the operation.
    #[error("interceptor `{interceptor}` failed during {hook}: {source}")]
    Interceptor {
        hook: Hook,
        interceptor: String,
        source: BoxError,
    },

    /// The retry strategy refused to admit the operation.
    #[error("retry capacity unavailable: {0}")]
    Throttled(#[source] RetryError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The failure could not be classified.
    #[error("unknown error: {source}")]
    Unknown {
        source: BoxError,
        response: Option<R>,
    },
}

impl<R> SdkError<R> {
    /// Create a client error from a message.
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
            source: None,
        }
    }

    /// Create a client error that wraps an underlying cause.
    pub fn client_with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Client {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wrap the failure of an attempt step that runs before transmit (auth
    /// selection, endpoint resolution, signing).
    ///
    /// A [`TransportError`] raised by the step keeps its kind so the retry
    /// classifiers see the I/O failure. Anything else becomes a client error.
    pub fn from_step_failure(message: impl Into<String>, error: BoxError) -> Self {
        match error.downcast::<TransportError>() {
            Ok(transport) => Self::Transport(*transport),
            Err(other) => Self::client_with_source(message, other),
        }
    }

    /// Create an unknown error without a response.
    pub fn unknown(source: impl Into<BoxError>) -> Self {
        Self::Unknown {
            source: source.into(),
            response: None,
        }
    }

    /// The raw response that produced this error, if one was received.
    pub fn raw_response(&self) -> Option<&R> {
        match self {
            Self::Service { response, .. } => Some(response),
            Self::Unknown { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    /// The transport error, if this is a transport failure.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }

    /// The inner service error, if this is a service failure.
    pub fn service_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Service { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Whether the failure came from an interceptor hook.
    pub fn is_interceptor_error(&self) -> bool {
        matches!(self, Self::Interceptor { .. })
    }

    /// Whether the operation was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Kind of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request or response did not complete in time.
    Timeout,
    /// A connection could not be established.
    Connect,
    /// The connection failed mid-flight.
    Io,
    /// Any other transport failure.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Io => "io",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Error yielded by a transport executor.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {source}")]
pub struct TransportError {
    kind: TransportErrorKind,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn timeout(source: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::Timeout, source)
    }

    pub fn connect(source: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::Connect, source)
    }

    pub fn io(source: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::Io, source)
    }

    pub fn other(source: impl Into<BoxError>) -> Self {
        Self::new(TransportErrorKind::Other, source)
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Convert an arbitrary boxed error, keeping it intact if it already is a
    /// `TransportError`.
    pub fn from_boxed(error: BoxError) -> Self {
        match error.downcast::<TransportError>() {
            Ok(transport) => *transport,
            Err(other) => Self::other(other),
        }
    }
}

/// Failure returned by a deserializer.
///
/// The orchestrator attaches the received response when converting this into
/// an [`SdkError`].
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// The peer answered with a modeled, domain-level failure.
    #[error("service error: {source}")]
    Service {
        source: BoxError,
        kind: Option<ErrorKind>,
    },

    /// The response could not be interpreted.
    #[error("unhandled response: {0}")]
    Unhandled(BoxError),
}

impl ResponseError {
    /// A modeled service error without a retry hint.
    pub fn service(source: impl Into<BoxError>) -> Self {
        Self::Service {
            source: source.into(),
            kind: None,
        }
    }

    /// A modeled service error carrying a retry hint.
    pub fn service_with_kind(source: impl Into<BoxError>, kind: ErrorKind) -> Self {
        Self::Service {
            source: source.into(),
            kind: Some(kind),
        }
    }

    pub fn unhandled(source: impl Into<BoxError>) -> Self {
        Self::Unhandled(source.into())
    }

    /// Attach the received response, producing the operation error.
    pub fn into_sdk_error<R>(self, response: R) -> SdkError<R> {
        match self {
            Self::Service { source, kind } => SdkError::Service {
                source,
                kind,
                response,
            },
            Self::Unhandled(source) => SdkError::Unknown {
                source,
                response: Some(response),
            },
        }
    }
}

/// Configuration error raised when an orchestrator is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// A required component was not supplied.
    #[error("missing required component: {0}")]
    MissingComponent(&'static str),

    /// A supplied value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
