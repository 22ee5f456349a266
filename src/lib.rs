//! siumai-runtime
//!
//! Request-execution core for generated service clients. An [`Orchestrator`]
//! runs one operation through serialization, a retry loop of
//! sign/transmit/deserialize attempts, and completion, calling
//! [`Interceptor`] hooks at every stage.
//!
//! ```rust,ignore
//! use siumai_runtime::prelude::*;
//!
//! let orchestrator = Orchestrator::<GetItem>::builder()
//!     .with_operation_name("GetItem")
//!     .with_service_name("items")
//!     .with_serializer_fn(|input: &GetItemInput, req: &mut HttpRequestBuilder, _: &mut Attributes| {
//!         req.set_path(format!("/items/{}", input.id));
//!         Ok(())
//!     })
//!     .with_deserializer_fn(parse_item)
//!     .with_endpoint(StaticEndpoint::parse("https://api.example.com")?)
//!     .with_transport(ReqwestTransport::new(reqwest::Client::new()))
//!     .with_interceptor(LoggingInterceptor)
//!     .build()?;
//!
//! let item = orchestrator.execute(GetItemInput { id: "42".into() }).await?;
//! ```
#![deny(unsafe_code)]

pub mod attributes;
pub mod auth;
pub mod cancel;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod middleware;
pub mod operation;
pub mod orchestrator;
pub mod retry;
pub mod transport;

pub use attributes::{AttributeKey, Attributes};
pub use cancel::CancelHandle;
pub use error::{BoxError, BuildError, ErrorKind, SdkError, TransportError};
pub use interceptor::{Hook, Interceptor, InterceptorContext};
pub use operation::{HttpOperation, Operation, OperationResult};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};

/// Commonly used types for building and running operations.
pub mod prelude {
    pub use crate::attributes::{AttributeKey, Attributes, well_known};
    pub use crate::auth::{
        AuthSchemeId, AuthSchemeSelector, BearerTokenSigner, CandidateAuthSchemeSelector,
        NoAuthSchemeSelector, SelectedAuthScheme, Signer,
    };
    pub use crate::cancel::CancelHandle;
    pub use crate::endpoint::{EndpointApplier, StaticEndpoint};
    pub use crate::error::{
        BoxError, BuildError, ErrorKind, ResponseError, SdkError, TransportError,
        TransportErrorKind,
    };
    pub use crate::http::{
        Body, HttpRequest, HttpRequestBuilder, HttpResponse, Request, RequestBuilder, Response,
    };
    pub use crate::interceptor::presets::{
        ContentLengthInterceptor, InvocationIdInterceptor, LoggingInterceptor,
        RequestAttemptInterceptor,
    };
    pub use crate::interceptor::{
        Hook, InputContext, InputMutContext, Interceptor, InterceptorContext, OutputContext,
        OutputMutContext, RequestContext, RequestMutContext, ResponseContext, ResponseMutContext,
        SharedInterceptor,
    };
    pub use crate::middleware::{Middleware, MiddlewareStack, Next};
    pub use crate::operation::{HttpOperation, Operation, OperationResult};
    pub use crate::orchestrator::{Deserializer, Orchestrator, OrchestratorBuilder, SerializeStep};
    pub use crate::retry::{
        ExponentialBackoff, NeverRetryStrategy, RetryStrategy, StandardRetryStrategy,
    };
    pub use crate::transport::TransportExecutor;
    #[cfg(feature = "reqwest-transport")]
    pub use crate::transport::ReqwestTransport;
}
