//! Ordered interceptor collection

use std::fmt;

use super::{Hook, InterceptorContext, SharedInterceptor};
use crate::error::{BoxError, SdkError};
use crate::operation::Operation;

/// Flat, ordered list of interceptors.
///
/// Registration order is the invocation order for every hook, including the
/// `after_*` hooks. Chains from several sources (global, client, operation)
/// are merged with [`InterceptorChain::extend`], which appends and keeps each
/// source's order.
pub struct InterceptorChain<Op: Operation> {
    interceptors: Vec<SharedInterceptor<Op>>,
}

impl<Op: Operation> Default for InterceptorChain<Op> {
    fn default() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }
}

impl<Op: Operation> Clone for InterceptorChain<Op> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<Op: Operation> fmt::Debug for InterceptorChain<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.interceptors.iter().map(|i| i.name()))
            .finish()
    }
}

impl<Op: Operation> InterceptorChain<Op> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interceptor: SharedInterceptor<Op>) {
        self.interceptors.push(interceptor);
    }

    pub fn with(mut self, interceptor: SharedInterceptor<Op>) -> Self {
        self.push(interceptor);
        self
    }

    /// Append every interceptor of `other`, after the ones already present.
    pub fn extend(&mut self, other: impl IntoIterator<Item = SharedInterceptor<Op>>) {
        self.interceptors.extend(other);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedInterceptor<Op>> {
        self.interceptors.iter()
    }

    /// Run `hook` on every interceptor in order.
    ///
    /// Stops at the first failure. Hooks whose view needs a field the context
    /// does not hold yet (e.g. a response after a transport failure) are
    /// skipped.
    pub fn invoke(
        &self,
        hook: Hook,
        ctx: &mut InterceptorContext<Op>,
    ) -> Result<(), SdkError<Op::Response>> {
        if self.interceptors.is_empty() {
            return Ok(());
        }

        match hook {
            Hook::BeforeExecution => {
                let mut view = ctx.input_view();
                self.each(hook, |i| i.before_execution(&mut view))
            }
            Hook::ModifyBeforeSerialization => {
                let mut view = ctx.input_mut_view();
                self.each(hook, |i| i.modify_before_serialization(&mut view))
            }
            Hook::BeforeSerialization => {
                let mut view = ctx.input_view();
                self.each(hook, |i| i.before_serialization(&mut view))
            }
            Hook::AfterSerialization => match ctx.request_view() {
                Some(mut view) => self.each(hook, |i| i.after_serialization(&mut view)),
                None => Ok(()),
            },
            Hook::ModifyBeforeRetryLoop => match ctx.request_mut_view() {
                Some(mut view) => self.each(hook, |i| i.modify_before_retry_loop(&mut view)),
                None => Ok(()),
            },
            Hook::BeforeRetryLoop => match ctx.request_view() {
                Some(mut view) => self.each(hook, |i| i.before_retry_loop(&mut view)),
                None => Ok(()),
            },
            Hook::BeforeAttempt => match ctx.request_view() {
                Some(mut view) => self.each(hook, |i| i.before_attempt(&mut view)),
                None => Ok(()),
            },
            Hook::ModifyBeforeSigning => match ctx.request_mut_view() {
                Some(mut view) => self.each(hook, |i| i.modify_before_signing(&mut view)),
                None => Ok(()),
            },
            Hook::BeforeSigning => match ctx.request_view() {
                Some(mut view) => self.each(hook, |i| i.before_signing(&mut view)),
                None => Ok(()),
            },
            Hook::AfterSigning => match ctx.request_view() {
                Some(mut view) => self.each(hook, |i| i.after_signing(&mut view)),
                None => Ok(()),
            },
            Hook::ModifyBeforeTransmit => match ctx.request_mut_view() {
                Some(mut view) => self.each(hook, |i| i.modify_before_transmit(&mut view)),
                None => Ok(()),
            },
            Hook::BeforeTransmit => match ctx.request_view() {
                Some(mut view) => self.each(hook, |i| i.before_transmit(&mut view)),
                None => Ok(()),
            },
            Hook::AfterTransmit => match ctx.response_view() {
                Some(mut view) => self.each(hook, |i| i.after_transmit(&mut view)),
                None => Ok(()),
            },
            Hook::ModifyBeforeDeserialization => match ctx.response_mut_view() {
                Some(mut view) => self.each(hook, |i| i.modify_before_deserialization(&mut view)),
                None => Ok(()),
            },
            Hook::BeforeDeserialization => match ctx.response_view() {
                Some(mut view) => self.each(hook, |i| i.before_deserialization(&mut view)),
                None => Ok(()),
            },
            Hook::AfterDeserialization => match ctx.output_view() {
                Some(mut view) => self.each(hook, |i| i.after_deserialization(&mut view)),
                None => Ok(()),
            },
            Hook::ModifyBeforeAttemptCompletion => match ctx.output_mut_view() {
                Some(mut view) => {
                    self.each(hook, |i| i.modify_before_attempt_completion(&mut view))
                }
                None => Ok(()),
            },
            Hook::AfterAttempt => match ctx.output_view() {
                Some(mut view) => self.each(hook, |i| i.after_attempt(&mut view)),
                None => Ok(()),
            },
            Hook::ModifyBeforeCompletion => match ctx.output_mut_view() {
                Some(mut view) => self.each(hook, |i| i.modify_before_completion(&mut view)),
                None => Ok(()),
            },
            Hook::AfterExecution => match ctx.output_view() {
                Some(mut view) => self.each(hook, |i| i.after_execution(&mut view)),
                None => Ok(()),
            },
        }
    }

    fn each<F>(&self, hook: Hook, mut call: F) -> Result<(), SdkError<Op::Response>>
    where
        F: FnMut(&SharedInterceptor<Op>) -> Result<(), BoxError>,
    {
        for interceptor in &self.interceptors {
            tracing::trace!(
                target: "siumai::runtime",
                %hook,
                interceptor = interceptor.name(),
                "running hook"
            );
            if let Err(source) = call(interceptor) {
                tracing::debug!(
                    target: "siumai::runtime",
                    %hook,
                    interceptor = interceptor.name(),
                    error = %source,
                    "interceptor failed"
                );
                return Err(SdkError::Interceptor {
                    hook,
                    interceptor: interceptor.name().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }
}

impl<Op: Operation> FromIterator<SharedInterceptor<Op>> for InterceptorChain<Op> {
    fn from_iter<T: IntoIterator<Item = SharedInterceptor<Op>>>(iter: T) -> Self {
        Self {
            interceptors: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::http::HttpResponse;
    use crate::interceptor::{InputContext, Interceptor, OutputContext};
    use crate::operation::HttpOperation;

    type TestOp = HttpOperation<String, String>;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_before_execution: bool,
    }

    impl Interceptor<TestOp> for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn before_execution(&self, _ctx: &mut InputContext<'_, TestOp>) -> Result<(), BoxError> {
            self.log.lock().unwrap().push(format!("{}:before_execution", self.name));
            if self.fail_before_execution {
                return Err("boom".into());
            }
            Ok(())
        }

        fn after_execution(&self, _ctx: &mut OutputContext<'_, TestOp>) -> Result<(), BoxError> {
            self.log.lock().unwrap().push(format!("{}:after_execution", self.name));
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
        fail: bool,
    ) -> SharedInterceptor<TestOp> {
        Arc::new(Recorder {
            name,
            log: log.clone(),
            fail_before_execution: fail,
        })
    }

    #[test]
    fn after_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: InterceptorChain<TestOp> =
            [recorder("a", &log, false), recorder("b", &log, false)]
                .into_iter()
                .collect();

        let mut ctx = InterceptorContext::<TestOp>::new("input".to_string());
        ctx.set_output_or_error(Ok("done".to_string()));
        chain.invoke(Hook::BeforeExecution, &mut ctx).unwrap();
        chain.invoke(Hook::AfterExecution, &mut ctx).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:before_execution",
                "b:before_execution",
                "a:after_execution",
                "b:after_execution",
            ]
        );
    }

    #[test]
    fn failure_stops_remaining_interceptors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = InterceptorChain::new();
        chain.push(recorder("a", &log, true));
        chain.push(recorder("b", &log, false));

        let mut ctx = InterceptorContext::<TestOp>::new("input".to_string());
        let err: SdkError<HttpResponse> =
            chain.invoke(Hook::BeforeExecution, &mut ctx).unwrap_err();

        match err {
            SdkError::Interceptor { hook, interceptor, .. } => {
                assert_eq!(hook, Hook::BeforeExecution);
                assert_eq!(interceptor, "a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["a:before_execution"]);
    }

    #[test]
    fn hooks_without_required_fields_are_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new().with(recorder("a", &log, false));

        let mut ctx = InterceptorContext::<TestOp>::new("input".to_string());
        chain.invoke(Hook::AfterExecution, &mut ctx).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }
}
