//! Tracing-backed logging interceptor

use crate::attributes::well_known;
use crate::error::BoxError;
use crate::http::Response;
use crate::interceptor::{Interceptor, InputContext, OutputContext, RequestContext, ResponseContext};
use crate::operation::Operation;

/// Logs the operation lifecycle with `tracing` (no headers or bodies).
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl<Op: Operation> Interceptor<Op> for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    fn before_execution(&self, ctx: &mut InputContext<'_, Op>) -> Result<(), BoxError> {
        let operation = ctx
            .attributes()
            .get(&well_known::OPERATION_NAME)
            .map(String::as_str)
            .unwrap_or("unknown");
        tracing::debug!(target: "siumai::runtime", operation, "operation started");
        Ok(())
    }

    fn before_transmit(&self, ctx: &mut RequestContext<'_, Op>) -> Result<(), BoxError> {
        let attempt = ctx.attributes().get(&well_known::ATTEMPT).copied().unwrap_or(1);
        tracing::debug!(target: "siumai::runtime", attempt, "sending request");
        Ok(())
    }

    fn after_transmit(&self, ctx: &mut ResponseContext<'_, Op>) -> Result<(), BoxError> {
        let status = ctx.response().status().as_u16();
        tracing::debug!(target: "siumai::runtime", status, "response received");
        Ok(())
    }

    fn after_attempt(&self, ctx: &mut OutputContext<'_, Op>) -> Result<(), BoxError> {
        let attempt = ctx.attributes().get(&well_known::ATTEMPT).copied().unwrap_or(1);
        match ctx.output_or_error() {
            Ok(_) => tracing::trace!(target: "siumai::runtime", attempt, "attempt succeeded"),
            Err(err) => {
                tracing::debug!(target: "siumai::runtime", attempt, err = %err, "attempt failed")
            }
        }
        Ok(())
    }

    fn after_execution(&self, ctx: &mut OutputContext<'_, Op>) -> Result<(), BoxError> {
        match ctx.output_or_error() {
            Ok(_) => tracing::debug!(target: "siumai::runtime", "operation succeeded"),
            Err(err) => tracing::debug!(target: "siumai::runtime", err = %err, "operation failed"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::attributes::Attributes;
    use crate::interceptor::{Hook, InterceptorChain, InterceptorContext};
    use crate::operation::HttpOperation;

    type TestOp = HttpOperation<(), ()>;

    #[traced_test]
    #[test]
    fn logs_operation_name_and_outcome() {
        let chain: InterceptorChain<TestOp> =
            InterceptorChain::new().with(std::sync::Arc::new(LoggingInterceptor::new()));
        let mut attributes = Attributes::new();
        attributes.set(&well_known::OPERATION_NAME, "PutItem".to_string());

        let mut ctx = InterceptorContext::<TestOp>::with_attributes((), attributes);
        chain.invoke(Hook::BeforeExecution, &mut ctx).unwrap();
        ctx.set_output_or_error(Ok(()));
        chain.invoke(Hook::AfterExecution, &mut ctx).unwrap();

        assert!(logs_contain("operation started"));
        assert!(logs_contain("PutItem"));
        assert!(logs_contain("operation succeeded"));
    }
}
