//! Orchestrator builder

use std::collections::HashMap;
use std::sync::Arc;

use super::components::{Deserializer, FnDeserializer, FnSerializeStep, SerializeStep};
use super::{Orchestrator, OrchestratorInner};
use crate::attributes::Attributes;
use crate::auth::{
    AuthSchemeId, AuthSchemeSelector, NO_AUTH_SCHEME_ID, NoAuthSchemeSelector, NoAuthSigner,
    Signer,
};
use crate::endpoint::{EndpointApplier, NoEndpoint};
use crate::error::{BoxError, BuildError, ResponseError};
use crate::interceptor::{Interceptor, InterceptorChain, InterceptorProvider, SharedInterceptor};
use crate::middleware::{Middleware, MiddlewareStack, MiddlewareTransport, NamedMiddleware};
use crate::operation::{Operation, RequestBuilderOf};
use crate::retry::{ClassifyRetry, RetryClassifiers, SharedRetryStrategy, StandardRetryStrategy};
use crate::transport::{SharedTransport, TransportExecutor};

enum InterceptorSource<Op: Operation> {
    Single(SharedInterceptor<Op>),
    Provider(Arc<dyn InterceptorProvider<Op>>),
}

/// Accumulates the pluggable pieces of an [`Orchestrator`].
///
/// Serializer steps, a deserializer and a transport are required; everything
/// else has a default:
///
/// | Component | Default |
/// |---|---|
/// | auth scheme selector | [`NoAuthSchemeSelector`] |
/// | endpoint applier | [`NoEndpoint`] |
/// | signers | [`NoAuthSigner`] for `no-auth` |
/// | retry strategy | [`StandardRetryStrategy::default`] |
/// | retry classifiers | [`RetryClassifiers::default`] |
///
/// ```rust,ignore
/// let orchestrator = OrchestratorBuilder::<HttpOperation<GetItem, Item>>::new()
///     .with_operation_name("GetItem")
///     .with_serializer_fn(|input: &GetItem, builder: &mut HttpRequestBuilder, _: &mut Attributes| {
///         builder.set_path(format!("/items/{}", input.id));
///         Ok(())
///     })
///     .with_deserializer_fn(|response: &HttpResponse, _: &Attributes| parse_item(response))
///     .with_endpoint(StaticEndpoint::parse("https://api.example.com")?)
///     .with_transport(ReqwestTransport::default())
///     .with_interceptor(LoggingInterceptor)
///     .build()?;
/// ```
pub struct OrchestratorBuilder<Op: Operation> {
    operation_name: Option<String>,
    service_name: Option<String>,
    partition: Option<String>,
    serializer: Vec<Arc<dyn SerializeStep<Op>>>,
    deserializer: Option<Arc<dyn Deserializer<Op>>>,
    auth_scheme_selector: Arc<dyn AuthSchemeSelector<Op>>,
    endpoint: Arc<dyn EndpointApplier<Op>>,
    signers: HashMap<AuthSchemeId, Arc<dyn Signer<Op>>>,
    transport: Option<SharedTransport<Op>>,
    middleware: MiddlewareStack<Op>,
    retry_strategy: Option<SharedRetryStrategy>,
    retry_classifiers: RetryClassifiers<Op::Response>,
    interceptors: Vec<InterceptorSource<Op>>,
}

impl<Op: Operation> Default for OrchestratorBuilder<Op> {
    fn default() -> Self {
        let mut signers: HashMap<AuthSchemeId, Arc<dyn Signer<Op>>> = HashMap::new();
        signers.insert(NO_AUTH_SCHEME_ID, Arc::new(NoAuthSigner));
        Self {
            operation_name: None,
            service_name: None,
            partition: None,
            serializer: Vec::new(),
            deserializer: None,
            auth_scheme_selector: Arc::new(NoAuthSchemeSelector),
            endpoint: Arc::new(NoEndpoint),
            signers,
            transport: None,
            middleware: MiddlewareStack::new(),
            retry_strategy: None,
            retry_classifiers: RetryClassifiers::default(),
            interceptors: Vec::new(),
        }
    }
}

impl<Op: Operation> OrchestratorBuilder<Op> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Retry partition; defaults to the service name, then the operation name.
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Append a serializer step; steps run in registration order.
    pub fn with_serializer_step(mut self, step: impl SerializeStep<Op> + 'static) -> Self {
        self.serializer.push(Arc::new(step));
        self
    }

    pub fn with_serializer_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Op::Input, &mut RequestBuilderOf<Op>, &mut Attributes) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.with_serializer_step(FnSerializeStep::new(f))
    }

    pub fn with_deserializer(mut self, deserializer: impl Deserializer<Op> + 'static) -> Self {
        self.deserializer = Some(Arc::new(deserializer));
        self
    }

    pub fn with_deserializer_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Op::Response, &Attributes) -> Result<Op::Output, ResponseError>
            + Send
            + Sync
            + 'static,
    {
        self.with_deserializer(FnDeserializer::new(f))
    }

    pub fn with_auth_scheme_selector(
        mut self,
        selector: impl AuthSchemeSelector<Op> + 'static,
    ) -> Self {
        self.auth_scheme_selector = Arc::new(selector);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl EndpointApplier<Op> + 'static) -> Self {
        self.endpoint = Arc::new(endpoint);
        self
    }

    /// Register the signer used when `scheme_id` is selected.
    pub fn with_signer(
        mut self,
        scheme_id: AuthSchemeId,
        signer: impl Signer<Op> + 'static,
    ) -> Self {
        self.signers.insert(scheme_id, Arc::new(signer));
        self
    }

    pub fn with_transport(mut self, transport: impl TransportExecutor<Op> + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn with_shared_transport(mut self, transport: SharedTransport<Op>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Add a middleware as the innermost layer around the transport.
    pub fn with_middleware(
        mut self,
        name: impl Into<String>,
        middleware: impl Middleware<Op> + 'static,
    ) -> Self {
        self.middleware
            .push(NamedMiddleware::new(name, Arc::new(middleware)));
        self
    }

    pub fn with_middleware_stack(mut self, stack: MiddlewareStack<Op>) -> Self {
        for named in stack.into_vec() {
            self.middleware.push(named);
        }
        self
    }

    /// Share one strategy across orchestrators so partitions share budget.
    pub fn with_retry_strategy(mut self, strategy: SharedRetryStrategy) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    /// Replace the classifier list.
    pub fn with_retry_classifiers(mut self, classifiers: RetryClassifiers<Op::Response>) -> Self {
        self.retry_classifiers = classifiers;
        self
    }

    /// Append a classifier after the ones already configured.
    pub fn with_retry_classifier(
        mut self,
        classifier: impl ClassifyRetry<Op::Response> + 'static,
    ) -> Self {
        self.retry_classifiers.push(Arc::new(classifier));
        self
    }

    pub fn with_interceptor(mut self, interceptor: impl Interceptor<Op> + 'static) -> Self {
        self.interceptors
            .push(InterceptorSource::Single(Arc::new(interceptor)));
        self
    }

    pub fn with_shared_interceptor(mut self, interceptor: SharedInterceptor<Op>) -> Self {
        self.interceptors.push(InterceptorSource::Single(interceptor));
        self
    }

    /// Append a whole chain (e.g. client-level interceptors), keeping its order.
    pub fn with_interceptors(
        mut self,
        chain: impl IntoIterator<Item = SharedInterceptor<Op>>,
    ) -> Self {
        self.interceptors
            .extend(chain.into_iter().map(InterceptorSource::Single));
        self
    }

    /// The provider is invoked once, at [`build`](Self::build); its
    /// interceptors take the provider's position in the chain.
    pub fn with_interceptor_provider(
        mut self,
        provider: impl InterceptorProvider<Op> + 'static,
    ) -> Self {
        self.interceptors
            .push(InterceptorSource::Provider(Arc::new(provider)));
        self
    }

    pub fn build(self) -> Result<Orchestrator<Op>, BuildError> {
        if self.serializer.is_empty() {
            return Err(BuildError::MissingComponent("serializer"));
        }
        let deserializer = self
            .deserializer
            .ok_or(BuildError::MissingComponent("deserializer"))?;
        let transport = self
            .transport
            .ok_or(BuildError::MissingComponent("transport"))?;

        let transport: SharedTransport<Op> = if self.middleware.is_empty() {
            transport
        } else {
            Arc::new(MiddlewareTransport::new(self.middleware, transport))
        };

        let mut interceptors = InterceptorChain::new();
        for source in self.interceptors {
            match source {
                InterceptorSource::Single(interceptor) => interceptors.push(interceptor),
                InterceptorSource::Provider(provider) => {
                    interceptors.extend(provider.interceptors())
                }
            }
        }

        let operation_name = self
            .operation_name
            .unwrap_or_else(|| "unnamed-operation".to_string());
        let partition = self
            .partition
            .or_else(|| self.service_name.clone())
            .unwrap_or_else(|| operation_name.clone());
        let retry_strategy = self
            .retry_strategy
            .unwrap_or_else(|| Arc::new(StandardRetryStrategy::default()));

        tracing::debug!(
            target: "siumai::runtime",
            operation = %operation_name,
            partition = %partition,
            interceptors = interceptors.len(),
            "orchestrator built"
        );

        Ok(Orchestrator {
            inner: Arc::new(OrchestratorInner {
                operation_name,
                service_name: self.service_name,
                partition,
                serializer: self.serializer,
                deserializer,
                auth_scheme_selector: self.auth_scheme_selector,
                endpoint: self.endpoint,
                signers: self.signers,
                transport,
                retry_strategy,
                retry_classifiers: self.retry_classifiers,
                interceptors,
            }),
        })
    }
}
