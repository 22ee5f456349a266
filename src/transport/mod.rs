//! Transport executors
//!
//! A transport executor sends one request and returns the response, or a
//! [`TransportError`] when no response arrived. Timeouts are the executor's
//! responsibility. Custom executors can return synthetic responses, which is
//! how tests and offline clients avoid the network entirely.

#[cfg(feature = "reqwest-transport")]
mod reqwest_transport;

use std::sync::Arc;

use async_trait::async_trait;

use crate::attributes::Attributes;
use crate::error::TransportError;
use crate::operation::Operation;

#[cfg(feature = "reqwest-transport")]
pub use reqwest_transport::ReqwestTransport;

/// Sends a request over the wire.
#[async_trait]
pub trait TransportExecutor<Op: Operation>: Send + Sync {
    async fn execute(
        &self,
        request: Op::Request,
        attributes: &Attributes,
    ) -> Result<Op::Response, TransportError>;
}

/// Shared, type-erased transport executor.
pub type SharedTransport<Op> = Arc<dyn TransportExecutor<Op>>;
