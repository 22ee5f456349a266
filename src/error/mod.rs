//! Error Handling Module
//!
//! This module provides the error taxonomy used by the request-execution runtime:
//! - Operation errors (`SdkError`): client, service, transport, interceptor, throttling,
//!   cancellation and unknown failures
//! - Transport-level errors (`TransportError`) yielded by transport executors
//! - Deserializer results (`ResponseError`) before the raw response is attached
//! - Build-time configuration errors (`BuildError`)
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use siumai_runtime::error::{SdkError, TransportError};
//!
//! let error: SdkError<()> = TransportError::timeout("read timed out").into();
//! assert!(error.transport_error().is_some());
//! ```

// Module declarations
mod conversions;
pub mod types;

// Re-exports for public API
pub use types::*;
