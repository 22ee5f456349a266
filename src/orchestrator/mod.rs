//! Orchestrator
//!
//! Drives one operation end to end:
//!
//! ```text
//! before_execution → modify_before_serialization → before_serialization
//! serialize
//! after_serialization → modify_before_retry_loop → before_retry_loop
//! retry loop (acquire token, then per attempt):
//!     before_attempt → select auth scheme → apply endpoint
//!     modify_before_signing → before_signing → sign → after_signing
//!     modify_before_transmit → before_transmit → transmit (middleware + transport) → after_transmit
//!     modify_before_deserialization → before_deserialization → deserialize → after_deserialization
//!     modify_before_attempt_completion → after_attempt
//!     success: record_success, leave loop; failure: classify, schedule retry or leave loop
//! modify_before_completion → after_execution
//! ```
//!
//! A failing step inside an attempt becomes that attempt's result and goes
//! through classification like any error response. A failing hook ends the
//! operation: no further attempts are made, and only the attempt-completion
//! and completion hooks still run.

mod builder;
pub mod components;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attributes::{Attributes, well_known};
use crate::auth::{AuthSchemeId, AuthSchemeSelector, SelectedAuthScheme, Signer};
use crate::cancel::CancelHandle;
use crate::endpoint::EndpointApplier;
use crate::error::SdkError;
use crate::http::{Request, RequestBuilder};
use crate::interceptor::{Hook, InterceptorChain, InterceptorContext};
use crate::operation::{Operation, OperationResult, RequestBuilderOf};
use crate::retry::{RetryClassifiers, SharedRetryStrategy};
use crate::transport::SharedTransport;

pub use builder::OrchestratorBuilder;
pub use components::{Deserializer, FnDeserializer, FnSerializeStep, SerializeStep};

pub(crate) struct OrchestratorInner<Op: Operation> {
    operation_name: String,
    service_name: Option<String>,
    partition: String,
    serializer: Vec<Arc<dyn SerializeStep<Op>>>,
    deserializer: Arc<dyn Deserializer<Op>>,
    auth_scheme_selector: Arc<dyn AuthSchemeSelector<Op>>,
    endpoint: Arc<dyn EndpointApplier<Op>>,
    signers: HashMap<AuthSchemeId, Arc<dyn Signer<Op>>>,
    transport: SharedTransport<Op>,
    retry_strategy: SharedRetryStrategy,
    retry_classifiers: RetryClassifiers<Op::Response>,
    interceptors: InterceptorChain<Op>,
}

/// Executes one kind of operation. Cheap to clone; clones share components.
pub struct Orchestrator<Op: Operation> {
    inner: Arc<OrchestratorInner<Op>>,
}

impl<Op: Operation> Clone for Orchestrator<Op> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Op: Operation> fmt::Debug for Orchestrator<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("operation_name", &self.inner.operation_name)
            .field("service_name", &self.inner.service_name)
            .field("partition", &self.inner.partition)
            .field("serializer_steps", &self.inner.serializer.len())
            .field("interceptors", &self.inner.interceptors)
            .field("retry_strategy", &self.inner.retry_strategy)
            .field("retry_classifiers", &self.inner.retry_classifiers)
            .finish_non_exhaustive()
    }
}

impl<Op: Operation> Orchestrator<Op> {
    pub fn builder() -> OrchestratorBuilder<Op> {
        OrchestratorBuilder::new()
    }

    pub fn operation_name(&self) -> &str {
        &self.inner.operation_name
    }

    pub fn partition(&self) -> &str {
        &self.inner.partition
    }

    pub fn interceptors(&self) -> &InterceptorChain<Op> {
        &self.inner.interceptors
    }

    /// Run the operation to completion.
    pub async fn execute(&self, input: Op::Input) -> OperationResult<Op> {
        self.execute_with_attributes(input, Attributes::new(), &CancelHandle::new())
            .await
    }

    /// Run the operation, stopping early once `cancel` fires.
    pub async fn execute_with_cancel(
        &self,
        input: Op::Input,
        cancel: &CancelHandle,
    ) -> OperationResult<Op> {
        self.execute_with_attributes(input, Attributes::new(), cancel)
            .await
    }

    /// Run the operation with caller-provided attributes, e.g. an invocation
    /// id chosen upstream.
    pub async fn execute_with_attributes(
        &self,
        input: Op::Input,
        attributes: Attributes,
        cancel: &CancelHandle,
    ) -> OperationResult<Op> {
        let mut ctx = InterceptorContext::with_attributes(input, attributes);
        self.seed_attributes(ctx.attributes_mut());

        tracing::debug!(
            target: "siumai::runtime",
            operation = %self.inner.operation_name,
            "executing operation"
        );
        if let Err(error) = self.run(&mut ctx, cancel).await {
            ctx.set_output_or_error(Err(error));
        }
        self.finish(ctx)
    }

    fn seed_attributes(&self, attributes: &mut Attributes) {
        attributes.set(
            &well_known::OPERATION_NAME,
            self.inner.operation_name.clone(),
        );
        if let Some(service) = &self.inner.service_name {
            attributes.set(&well_known::SERVICE_NAME, service.clone());
        }
        attributes.set(&well_known::PARTITION, self.inner.partition.clone());
    }

    fn invoke(
        &self,
        hook: Hook,
        ctx: &mut InterceptorContext<Op>,
    ) -> Result<(), SdkError<Op::Response>> {
        self.inner.interceptors.invoke(hook, ctx)
    }

    async fn run(
        &self,
        ctx: &mut InterceptorContext<Op>,
        cancel: &CancelHandle,
    ) -> Result<(), SdkError<Op::Response>> {
        check_cancelled(cancel)?;
        self.invoke(Hook::BeforeExecution, ctx)?;
        self.invoke(Hook::ModifyBeforeSerialization, ctx)?;
        self.invoke(Hook::BeforeSerialization, ctx)?;

        let request = self.serialize(ctx)?;
        ctx.set_request(request);

        self.invoke(Hook::AfterSerialization, ctx)?;
        self.invoke(Hook::ModifyBeforeRetryLoop, ctx)?;
        self.invoke(Hook::BeforeRetryLoop, ctx)?;

        let base_request = current_request(ctx)?;
        self.retry_loop(ctx, base_request, cancel).await
    }

    fn serialize(
        &self,
        ctx: &mut InterceptorContext<Op>,
    ) -> Result<Op::Request, SdkError<Op::Response>> {
        let mut builder = RequestBuilderOf::<Op>::default();
        let (input, attributes) = ctx.input_and_attributes_mut();
        for step in &self.inner.serializer {
            step.serialize(input, &mut builder, attributes)
                .map_err(|e| SdkError::client_with_source("failed to serialize request", e))?;
        }
        Ok(builder.build())
    }

    /// Returns `Err` only for failures before the first attempt or for
    /// cancellation; attempt outcomes are left in the context.
    async fn retry_loop(
        &self,
        ctx: &mut InterceptorContext<Op>,
        base_request: Op::Request,
        cancel: &CancelHandle,
    ) -> Result<(), SdkError<Op::Response>> {
        let strategy = &self.inner.retry_strategy;
        let mut token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SdkError::Cancelled),
            token = strategy.acquire_initial_token(&self.inner.partition) => {
                token.map_err(SdkError::Throttled)?
            }
        };
        ctx.attributes_mut()
            .set(&well_known::MAX_ATTEMPTS, strategy.max_attempts());

        loop {
            let attempt = token.attempt();
            ctx.attributes_mut().set(&well_known::ATTEMPT, attempt);
            // Each attempt works on its own copy; the transport may still hold
            // the previous one.
            ctx.begin_attempt(base_request.to_builder().build());

            let mut halted = false;
            if let Err(error) = self.attempt(ctx, cancel).await {
                halted = error.is_interceptor_error() || error.is_cancelled();
                ctx.set_output_or_error(Err(error));
            }

            let completion = self
                .invoke(Hook::ModifyBeforeAttemptCompletion, ctx)
                .and_then(|()| self.invoke(Hook::AfterAttempt, ctx));
            if let Err(error) = completion {
                halted = true;
                ctx.set_output_or_error(Err(error));
            }

            let info = match ctx.output_or_error() {
                Some(Ok(_)) => {
                    tracing::debug!(target: "siumai::runtime", attempt, "attempt succeeded");
                    strategy.record_success(token);
                    return Ok(());
                }
                Some(Err(error)) if !halted => self.inner.retry_classifiers.classify(error),
                Some(Err(_)) => return Ok(()),
                None => return Err(SdkError::unknown("attempt finished without a result")),
            };

            let scheduled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SdkError::Cancelled),
                scheduled = strategy.schedule_retry(token, &info) => scheduled,
            };
            match scheduled {
                Ok(next) => {
                    tracing::debug!(
                        target: "siumai::runtime",
                        attempt,
                        kind = %info.kind(),
                        delay_ms = next.delay().as_millis() as u64,
                        "retrying after failed attempt"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(SdkError::Cancelled),
                        _ = tokio::time::sleep(next.delay()) => {}
                    }
                    token = next;
                }
                Err(reason) => {
                    tracing::debug!(
                        target: "siumai::runtime",
                        attempt,
                        kind = %info.kind(),
                        %reason,
                        "not retrying; returning last error"
                    );
                    return Ok(());
                }
            }
        }
    }

    async fn attempt(
        &self,
        ctx: &mut InterceptorContext<Op>,
        cancel: &CancelHandle,
    ) -> Result<(), SdkError<Op::Response>> {
        check_cancelled(cancel)?;
        self.invoke(Hook::BeforeAttempt, ctx)?;

        let scheme = self
            .inner
            .auth_scheme_selector
            .select(ctx.input(), ctx.attributes())
            .await
            .map_err(|e| SdkError::from_step_failure("failed to select an auth scheme", e))?
            .unwrap_or_else(SelectedAuthScheme::no_auth);
        ctx.attributes_mut()
            .set(&well_known::SELECTED_AUTH_SCHEME, scheme.clone());

        let request = self
            .inner
            .endpoint
            .apply(current_request(ctx)?, &scheme, ctx.attributes())
            .await
            .map_err(|e| SdkError::from_step_failure("failed to apply endpoint", e))?;
        ctx.set_request(request);

        self.invoke(Hook::ModifyBeforeSigning, ctx)?;
        self.invoke(Hook::BeforeSigning, ctx)?;
        let signer = self.inner.signers.get(scheme.scheme_id()).ok_or_else(|| {
            SdkError::client(format!(
                "no signer registered for auth scheme `{}`",
                scheme.scheme_id()
            ))
        })?;
        let request = signer
            .sign(current_request(ctx)?, &scheme, ctx.attributes())
            .await
            .map_err(|e| SdkError::from_step_failure("failed to sign request", e))?;
        ctx.set_request(request);
        self.invoke(Hook::AfterSigning, ctx)?;

        self.invoke(Hook::ModifyBeforeTransmit, ctx)?;
        self.invoke(Hook::BeforeTransmit, ctx)?;
        check_cancelled(cancel)?;
        let response = self
            .inner
            .transport
            .execute(current_request(ctx)?, ctx.attributes())
            .await?;
        ctx.set_response(response);
        self.invoke(Hook::AfterTransmit, ctx)?;

        self.invoke(Hook::ModifyBeforeDeserialization, ctx)?;
        self.invoke(Hook::BeforeDeserialization, ctx)?;
        let response = ctx
            .response()
            .cloned()
            .ok_or_else(|| SdkError::unknown("response missing from context"))?;
        let result = self
            .inner
            .deserializer
            .deserialize(&response, ctx.attributes())
            .await
            .map_err(|e| e.into_sdk_error(response));
        ctx.set_output_or_error(result);
        self.invoke(Hook::AfterDeserialization, ctx)?;
        Ok(())
    }

    fn finish(&self, mut ctx: InterceptorContext<Op>) -> OperationResult<Op> {
        if let Err(error) = self.invoke(Hook::ModifyBeforeCompletion, &mut ctx) {
            ctx.set_output_or_error(Err(error));
        }
        if let Err(error) = self.invoke(Hook::AfterExecution, &mut ctx) {
            ctx.set_output_or_error(Err(error));
        }

        let result = ctx
            .take_output_or_error()
            .unwrap_or_else(|| Err(SdkError::unknown("operation finished without a result")));
        match &result {
            Ok(_) => tracing::debug!(
                target: "siumai::runtime",
                operation = %self.inner.operation_name,
                "operation succeeded"
            ),
            Err(error) => tracing::debug!(
                target: "siumai::runtime",
                operation = %self.inner.operation_name,
                %error,
                "operation failed"
            ),
        }
        result
    }
}

fn current_request<Op: Operation>(
    ctx: &InterceptorContext<Op>,
) -> Result<Op::Request, SdkError<Op::Response>> {
    ctx.request()
        .cloned()
        .ok_or_else(|| SdkError::unknown("request missing from context"))
}

fn check_cancelled<R>(cancel: &CancelHandle) -> Result<(), SdkError<R>> {
    if cancel.is_cancelled() {
        Err(SdkError::Cancelled)
    } else {
        Ok(())
    }
}
