//! Interceptors that stamp headers onto outgoing requests

use reqwest::header::{CONTENT_LENGTH, HeaderValue};

use crate::attributes::well_known;
use crate::error::BoxError;
use crate::http::{Request, insert_header};
use crate::interceptor::{InputContext, Interceptor, RequestMutContext};
use crate::operation::Operation;

/// Header carrying the per-operation invocation id.
pub const INVOCATION_ID_HEADER: &str = "x-invocation-id";
/// Header carrying the 1-based attempt number.
pub const RETRY_ATTEMPT_HEADER: &str = "x-retry-attempt";
/// Header carrying `attempt=<n>; max=<m>`.
pub const REQUEST_INFO_HEADER: &str = "x-request-info";

/// Sets `content-length` before transmit when the body length is known.
///
/// Streaming bodies of unknown length are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ContentLengthInterceptor;

impl<Op: Operation> Interceptor<Op> for ContentLengthInterceptor {
    fn name(&self) -> &str {
        "content-length"
    }

    fn modify_before_transmit(&self, ctx: &mut RequestMutContext<'_, Op>) -> Result<(), BoxError> {
        let request = ctx.request_mut();
        if let Some(length) = request.body().content_length() {
            request
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(length));
        }
        Ok(())
    }
}

/// Generates one UUID v4 per operation and sends it on every attempt.
///
/// The id is stored under [`well_known::INVOCATION_ID`]; an id placed there
/// by the caller is kept.
#[derive(Debug, Clone, Default)]
pub struct InvocationIdInterceptor;

impl<Op: Operation> Interceptor<Op> for InvocationIdInterceptor {
    fn name(&self) -> &str {
        "invocation-id"
    }

    fn before_execution(&self, ctx: &mut InputContext<'_, Op>) -> Result<(), BoxError> {
        if !ctx.attributes().contains(&well_known::INVOCATION_ID) {
            ctx.attributes_mut()
                .set(&well_known::INVOCATION_ID, uuid::Uuid::new_v4().to_string());
        }
        Ok(())
    }

    fn modify_before_transmit(&self, ctx: &mut RequestMutContext<'_, Op>) -> Result<(), BoxError> {
        let id = ctx.attributes().require(&well_known::INVOCATION_ID)?.clone();
        insert_header(ctx.request_mut().headers_mut(), INVOCATION_ID_HEADER, &id)?;
        Ok(())
    }
}

/// Tells the server which attempt it is seeing.
#[derive(Debug, Clone, Default)]
pub struct RequestAttemptInterceptor;

impl<Op: Operation> Interceptor<Op> for RequestAttemptInterceptor {
    fn name(&self) -> &str {
        "request-attempt"
    }

    fn modify_before_transmit(&self, ctx: &mut RequestMutContext<'_, Op>) -> Result<(), BoxError> {
        let attempt = *ctx.attributes().require(&well_known::ATTEMPT)?;
        let max = ctx.attributes().get(&well_known::MAX_ATTEMPTS).copied();

        let headers = ctx.request_mut().headers_mut();
        headers.insert(RETRY_ATTEMPT_HEADER, HeaderValue::from(attempt));
        let info = match max {
            Some(max) => format!("attempt={attempt}; max={max}"),
            None => format!("attempt={attempt}"),
        };
        insert_header(headers, REQUEST_INFO_HEADER, &info)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::{Body, HttpRequest, RequestBuilder, header_str};
    use crate::interceptor::{Hook, InterceptorChain, InterceptorContext};
    use crate::operation::HttpOperation;

    type TestOp = HttpOperation<(), ()>;

    fn context_with_body(body: Body) -> InterceptorContext<TestOp> {
        let mut builder = HttpRequest::builder();
        builder.set_body(body);
        let mut ctx = InterceptorContext::<TestOp>::new(());
        ctx.set_request(builder.build());
        ctx
    }

    #[test]
    fn content_length_is_set_for_known_bodies() {
        let chain: InterceptorChain<TestOp> =
            InterceptorChain::new().with(Arc::new(ContentLengthInterceptor));
        let mut ctx = context_with_body(Body::from("hello"));

        chain.invoke(Hook::ModifyBeforeTransmit, &mut ctx).unwrap();
        let headers = ctx.request().unwrap().headers();
        assert_eq!(header_str(headers, "content-length"), Some("5"));
    }

    #[test]
    fn invocation_id_is_stable_across_attempts() {
        let chain: InterceptorChain<TestOp> =
            InterceptorChain::new().with(Arc::new(InvocationIdInterceptor));
        let mut ctx = context_with_body(Body::Empty);

        chain.invoke(Hook::BeforeExecution, &mut ctx).unwrap();
        chain.invoke(Hook::ModifyBeforeTransmit, &mut ctx).unwrap();
        let first = header_str(ctx.request().unwrap().headers(), INVOCATION_ID_HEADER)
            .unwrap()
            .to_string();

        ctx.begin_attempt(HttpRequest::builder().build());
        chain.invoke(Hook::ModifyBeforeTransmit, &mut ctx).unwrap();
        let second = header_str(ctx.request().unwrap().headers(), INVOCATION_ID_HEADER).unwrap();

        assert_eq!(first, second);
        assert!(uuid::Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn request_attempt_headers() {
        let chain: InterceptorChain<TestOp> =
            InterceptorChain::new().with(Arc::new(RequestAttemptInterceptor));
        let mut ctx = context_with_body(Body::Empty);
        ctx.attributes_mut().set(&well_known::ATTEMPT, 2);
        ctx.attributes_mut().set(&well_known::MAX_ATTEMPTS, 3);

        chain.invoke(Hook::ModifyBeforeTransmit, &mut ctx).unwrap();
        let headers = ctx.request().unwrap().headers();
        assert_eq!(header_str(headers, RETRY_ATTEMPT_HEADER), Some("2"));
        assert_eq!(
            header_str(headers, REQUEST_INFO_HEADER),
            Some("attempt=2; max=3")
        );
    }

    #[test]
    fn request_attempt_requires_attempt_attribute() {
        let chain: InterceptorChain<TestOp> =
            InterceptorChain::new().with(Arc::new(RequestAttemptInterceptor));
        let mut ctx = context_with_body(Body::Empty);

        let err = chain.invoke(Hook::ModifyBeforeTransmit, &mut ctx).unwrap_err();
        assert!(err.is_interceptor_error());
    }
}
