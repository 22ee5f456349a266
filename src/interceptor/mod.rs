//! Interceptors
//!
//! An interceptor observes and mutates one operation at fixed lifecycle points
//! ([`Hook`]). Every hook has a no-op default, so an implementation only
//! overrides what it needs:
//!
//! ```rust,ignore
//! use siumai_runtime::interceptor::{Interceptor, RequestMutContext};
//! use siumai_runtime::http::{Request, insert_header};
//!
//! struct UserAgent;
//!
//! impl<Op: Operation> Interceptor<Op> for UserAgent {
//!     fn name(&self) -> &str {
//!         "user-agent"
//!     }
//!
//!     fn modify_before_transmit(&self, ctx: &mut RequestMutContext<'_, Op>) -> Result<(), BoxError> {
//!         insert_header(ctx.request_mut().headers_mut(), "user-agent", "my-client/1.0")?;
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Hooks are synchronous. Returning an error aborts the operation and the
//! retry loop is bypassed. When the failing hook belongs to an attempt,
//! `modify_before_attempt_completion` and `after_attempt` still run for that
//! attempt; the completion hooks always run.

mod chain;
mod context;
pub mod presets;

use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::operation::Operation;

pub use chain::InterceptorChain;
pub use context::{
    InputContext, InputMutContext, InterceptorContext, OutputContext, OutputMutContext,
    RequestContext, RequestMutContext, ResponseContext, ResponseMutContext,
};

/// Lifecycle points, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    BeforeExecution,
    ModifyBeforeSerialization,
    BeforeSerialization,
    AfterSerialization,
    ModifyBeforeRetryLoop,
    BeforeRetryLoop,
    BeforeAttempt,
    ModifyBeforeSigning,
    BeforeSigning,
    AfterSigning,
    ModifyBeforeTransmit,
    BeforeTransmit,
    AfterTransmit,
    ModifyBeforeDeserialization,
    BeforeDeserialization,
    AfterDeserialization,
    ModifyBeforeAttemptCompletion,
    AfterAttempt,
    ModifyBeforeCompletion,
    AfterExecution,
}

impl Hook {
    /// Every hook in execution order.
    pub const ALL: [Hook; 20] = [
        Hook::BeforeExecution,
        Hook::ModifyBeforeSerialization,
        Hook::BeforeSerialization,
        Hook::AfterSerialization,
        Hook::ModifyBeforeRetryLoop,
        Hook::BeforeRetryLoop,
        Hook::BeforeAttempt,
        Hook::ModifyBeforeSigning,
        Hook::BeforeSigning,
        Hook::AfterSigning,
        Hook::ModifyBeforeTransmit,
        Hook::BeforeTransmit,
        Hook::AfterTransmit,
        Hook::ModifyBeforeDeserialization,
        Hook::BeforeDeserialization,
        Hook::AfterDeserialization,
        Hook::ModifyBeforeAttemptCompletion,
        Hook::AfterAttempt,
        Hook::ModifyBeforeCompletion,
        Hook::AfterExecution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Hook::BeforeExecution => "before_execution",
            Hook::ModifyBeforeSerialization => "modify_before_serialization",
            Hook::BeforeSerialization => "before_serialization",
            Hook::AfterSerialization => "after_serialization",
            Hook::ModifyBeforeRetryLoop => "modify_before_retry_loop",
            Hook::BeforeRetryLoop => "before_retry_loop",
            Hook::BeforeAttempt => "before_attempt",
            Hook::ModifyBeforeSigning => "modify_before_signing",
            Hook::BeforeSigning => "before_signing",
            Hook::AfterSigning => "after_signing",
            Hook::ModifyBeforeTransmit => "modify_before_transmit",
            Hook::BeforeTransmit => "before_transmit",
            Hook::AfterTransmit => "after_transmit",
            Hook::ModifyBeforeDeserialization => "modify_before_deserialization",
            Hook::BeforeDeserialization => "before_deserialization",
            Hook::AfterDeserialization => "after_deserialization",
            Hook::ModifyBeforeAttemptCompletion => "modify_before_attempt_completion",
            Hook::AfterAttempt => "after_attempt",
            Hook::ModifyBeforeCompletion => "modify_before_completion",
            Hook::AfterExecution => "after_execution",
        }
    }

    /// Whether the hook fires once per attempt rather than once per operation.
    pub fn is_per_attempt(self) -> bool {
        matches!(
            self,
            Hook::BeforeAttempt
                | Hook::ModifyBeforeSigning
                | Hook::BeforeSigning
                | Hook::AfterSigning
                | Hook::ModifyBeforeTransmit
                | Hook::BeforeTransmit
                | Hook::AfterTransmit
                | Hook::ModifyBeforeDeserialization
                | Hook::BeforeDeserialization
                | Hook::AfterDeserialization
                | Hook::ModifyBeforeAttemptCompletion
                | Hook::AfterAttempt
        )
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observes and mutates an operation at fixed lifecycle points.
///
/// Within each modify/read pair the `modify_*` hook runs first, so read-only
/// hooks always see the final value.
pub trait Interceptor<Op: Operation>: Send + Sync {
    /// Name used in error messages and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn before_execution(&self, _ctx: &mut InputContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    /// May replace or edit the input before it is serialized.
    fn modify_before_serialization(
        &self,
        _ctx: &mut InputMutContext<'_, Op>,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn before_serialization(&self, _ctx: &mut InputContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn after_serialization(&self, _ctx: &mut RequestContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    /// Edits made here are part of the base request every attempt copies.
    fn modify_before_retry_loop(
        &self,
        _ctx: &mut RequestMutContext<'_, Op>,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn before_retry_loop(&self, _ctx: &mut RequestContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn before_attempt(&self, _ctx: &mut RequestContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn modify_before_signing(&self, _ctx: &mut RequestMutContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn before_signing(&self, _ctx: &mut RequestContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn after_signing(&self, _ctx: &mut RequestContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    /// Last chance to change the request. The edit only affects the current
    /// attempt.
    fn modify_before_transmit(&self, _ctx: &mut RequestMutContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn before_transmit(&self, _ctx: &mut RequestContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn after_transmit(&self, _ctx: &mut ResponseContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn modify_before_deserialization(
        &self,
        _ctx: &mut ResponseMutContext<'_, Op>,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn before_deserialization(&self, _ctx: &mut ResponseContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn after_deserialization(&self, _ctx: &mut OutputContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    /// May override the attempt's result, e.g. to map a transport error onto
    /// a modeled one. Runs even when a step of the attempt failed.
    fn modify_before_attempt_completion(
        &self,
        _ctx: &mut OutputMutContext<'_, Op>,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn after_attempt(&self, _ctx: &mut OutputContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }

    fn modify_before_completion(
        &self,
        _ctx: &mut OutputMutContext<'_, Op>,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Always runs last, including after a failed hook.
    fn after_execution(&self, _ctx: &mut OutputContext<'_, Op>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Shared, type-erased interceptor.
pub type SharedInterceptor<Op> = Arc<dyn Interceptor<Op>>;

/// Factory for interceptors, invoked once per orchestrator build.
pub trait InterceptorProvider<Op: Operation>: Send + Sync {
    fn interceptors(&self) -> Vec<SharedInterceptor<Op>>;
}

impl<Op, F> InterceptorProvider<Op> for F
where
    Op: Operation,
    F: Fn() -> Vec<SharedInterceptor<Op>> + Send + Sync,
{
    fn interceptors(&self) -> Vec<SharedInterceptor<Op>> {
        self()
    }
}
