//! Type Conversions
//!
//! This module contains From trait implementations for converting
//! common error types into runtime errors.

use super::types::{ResponseError, TransportError};

impl From<serde_json::Error> for ResponseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unhandled(Box::new(err))
    }
}

#[cfg(feature = "reqwest-transport")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err)
        } else if err.is_connect() {
            Self::connect(err)
        } else if err.is_body() || err.is_request() {
            Self::io(err)
        } else {
            Self::other(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ResponseError = json_err.into();
        assert!(matches!(err, ResponseError::Unhandled(_)));
    }
}
