//! Shared fixtures for orchestrator integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use siumai_runtime::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EchoInput {
    pub foo: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoOutput {
    pub other_property: String,
}

pub type EchoOp = HttpOperation<EchoInput, EchoOutput>;

pub fn input(foo: &str) -> EchoInput {
    EchoInput {
        foo: foo.to_string(),
    }
}

pub fn serialize_echo(
    input: &EchoInput,
    request: &mut HttpRequestBuilder,
    _attributes: &mut Attributes,
) -> Result<(), BoxError> {
    request
        .set_method(reqwest::Method::POST)
        .set_path("/echo")
        .set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    request.set_body(Body::from(serde_json::to_vec(input)?));
    Ok(())
}

pub fn deserialize_echo(
    response: &HttpResponse,
    _attributes: &Attributes,
) -> Result<EchoOutput, ResponseError> {
    let body = response.body().as_bytes().unwrap_or_default();
    if response.status().is_success() {
        Ok(serde_json::from_slice(body)?)
    } else {
        Err(ResponseError::service(format!(
            "echo failed with status {}",
            response.status().as_u16()
        )))
    }
}

/// Builder with serializer, deserializer and endpoint set; no transport.
pub fn echo_builder() -> OrchestratorBuilder<EchoOp> {
    let endpoint = StaticEndpoint::parse("https://echo.test").expect("valid endpoint");
    Orchestrator::<EchoOp>::builder()
        .with_operation_name("Echo")
        .with_service_name("echo-service")
        .with_serializer_fn(serialize_echo)
        .with_deserializer_fn(deserialize_echo)
        .with_endpoint(endpoint)
}

/// Standard strategy without jitter: 100ms, 200ms, 400ms...
pub fn deterministic_retry(max_attempts: u32) -> Arc<StandardRetryStrategy> {
    Arc::new(
        StandardRetryStrategy::new()
            .with_max_attempts(max_attempts)
            .with_backoff(ExponentialBackoff::new().with_jitter(false)),
    )
}

pub fn ok_body(other: &str) -> String {
    format!(r#"{{"otherProperty":"{other}"}}"#)
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Status(u16, String),
    Fail(TransportErrorKind),
}

impl Scripted {
    pub fn ok(other: &str) -> Self {
        Self::Status(200, ok_body(other))
    }

    pub fn status(code: u16) -> Self {
        Self::Status(code, String::new())
    }
}

/// Transport replaying a script; the last entry repeats once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    inner: Arc<ScriptedState>,
}

#[derive(Debug)]
struct ScriptedState {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    calls: AtomicU32,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            inner: Arc::new(ScriptedState {
                script: Mutex::new(script.into_iter().collect()),
                last: Mutex::new(None),
                calls: AtomicU32::new(0),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn always(entry: Scripted) -> Self {
        Self::new([entry])
    }

    pub fn calls(&self) -> u32 {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    fn next_entry(&self) -> Scripted {
        let mut script = self.inner.script.lock().unwrap();
        let mut last = self.inner.last.lock().unwrap();
        match script.pop_front() {
            Some(entry) => {
                *last = Some(entry.clone());
                entry
            }
            None => last.clone().expect("script must not be empty"),
        }
    }
}

#[async_trait]
impl TransportExecutor<EchoOp> for ScriptedTransport {
    async fn execute(
        &self,
        request: HttpRequest,
        _attributes: &Attributes,
    ) -> Result<HttpResponse, TransportError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.lock().unwrap().push(request);
        match self.next_entry() {
            Scripted::Status(code, body) => Ok(HttpResponse::new(
                StatusCode::from_u16(code).expect("valid status"),
                body,
            )),
            Scripted::Fail(kind) => Err(TransportError::new(kind, "scripted failure")),
        }
    }
}

/// Records every hook it sees, optionally failing one hook on one attempt.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Hook>>>,
    fail_at: Option<(Hook, Option<u32>)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `hook`; with `attempt` set, only on that attempt.
    pub fn failing_at(hook: Hook, attempt: Option<u32>) -> Self {
        Self {
            log: Arc::default(),
            fail_at: Some((hook, attempt)),
        }
    }

    pub fn hooks(&self) -> Vec<Hook> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, hook: Hook, attributes: &Attributes) -> Result<(), BoxError> {
        self.log.lock().unwrap().push(hook);
        match self.fail_at {
            Some((target, attempt)) if target == hook => {
                let current = attributes.get(&well_known::ATTEMPT).copied();
                if attempt.is_none() || attempt == current {
                    Err(format!("recorder refused {hook}").into())
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

impl Interceptor<EchoOp> for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn before_execution(&self, ctx: &mut InputContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::BeforeExecution, ctx.attributes())
    }

    fn modify_before_serialization(
        &self,
        ctx: &mut InputMutContext<'_, EchoOp>,
    ) -> Result<(), BoxError> {
        self.record(Hook::ModifyBeforeSerialization, ctx.attributes())
    }

    fn before_serialization(&self, ctx: &mut InputContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::BeforeSerialization, ctx.attributes())
    }

    fn after_serialization(&self, ctx: &mut RequestContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::AfterSerialization, ctx.attributes())
    }

    fn modify_before_retry_loop(
        &self,
        ctx: &mut RequestMutContext<'_, EchoOp>,
    ) -> Result<(), BoxError> {
        self.record(Hook::ModifyBeforeRetryLoop, ctx.attributes())
    }

    fn before_retry_loop(&self, ctx: &mut RequestContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::BeforeRetryLoop, ctx.attributes())
    }

    fn before_attempt(&self, ctx: &mut RequestContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::BeforeAttempt, ctx.attributes())
    }

    fn modify_before_signing(
        &self,
        ctx: &mut RequestMutContext<'_, EchoOp>,
    ) -> Result<(), BoxError> {
        self.record(Hook::ModifyBeforeSigning, ctx.attributes())
    }

    fn before_signing(&self, ctx: &mut RequestContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::BeforeSigning, ctx.attributes())
    }

    fn after_signing(&self, ctx: &mut RequestContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::AfterSigning, ctx.attributes())
    }

    fn modify_before_transmit(
        &self,
        ctx: &mut RequestMutContext<'_, EchoOp>,
    ) -> Result<(), BoxError> {
        self.record(Hook::ModifyBeforeTransmit, ctx.attributes())
    }

    fn before_transmit(&self, ctx: &mut RequestContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::BeforeTransmit, ctx.attributes())
    }

    fn after_transmit(&self, ctx: &mut ResponseContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::AfterTransmit, ctx.attributes())
    }

    fn modify_before_deserialization(
        &self,
        ctx: &mut ResponseMutContext<'_, EchoOp>,
    ) -> Result<(), BoxError> {
        self.record(Hook::ModifyBeforeDeserialization, ctx.attributes())
    }

    fn before_deserialization(
        &self,
        ctx: &mut ResponseContext<'_, EchoOp>,
    ) -> Result<(), BoxError> {
        self.record(Hook::BeforeDeserialization, ctx.attributes())
    }

    fn after_deserialization(&self, ctx: &mut OutputContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::AfterDeserialization, ctx.attributes())
    }

    fn modify_before_attempt_completion(
        &self,
        ctx: &mut OutputMutContext<'_, EchoOp>,
    ) -> Result<(), BoxError> {
        self.record(Hook::ModifyBeforeAttemptCompletion, ctx.attributes())
    }

    fn after_attempt(&self, ctx: &mut OutputContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::AfterAttempt, ctx.attributes())
    }

    fn modify_before_completion(
        &self,
        ctx: &mut OutputMutContext<'_, EchoOp>,
    ) -> Result<(), BoxError> {
        self.record(Hook::ModifyBeforeCompletion, ctx.attributes())
    }

    fn after_execution(&self, ctx: &mut OutputContext<'_, EchoOp>) -> Result<(), BoxError> {
        self.record(Hook::AfterExecution, ctx.attributes())
    }
}

/// Hooks that run once before the retry loop.
pub const PRELUDE: [Hook; 6] = [
    Hook::BeforeExecution,
    Hook::ModifyBeforeSerialization,
    Hook::BeforeSerialization,
    Hook::AfterSerialization,
    Hook::ModifyBeforeRetryLoop,
    Hook::BeforeRetryLoop,
];

/// Hooks of one attempt that received a response.
pub const ATTEMPT: [Hook; 12] = [
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
];

pub const COMPLETION: [Hook; 2] = [Hook::ModifyBeforeCompletion, Hook::AfterExecution];

/// Expected hook sequence when every attempt receives a response.
pub fn expected_hooks(attempts: usize) -> Vec<Hook> {
    let mut hooks = PRELUDE.to_vec();
    for _ in 0..attempts {
        hooks.extend(ATTEMPT);
    }
    hooks.extend(COMPLETION);
    hooks
}

/// Retry strategy wrapper counting how often each method is called.
#[derive(Debug)]
pub struct CountingStrategy<S> {
    pub inner: S,
    pub initial: AtomicU32,
    pub scheduled: AtomicU32,
    pub successes: AtomicU32,
}

impl<S> CountingStrategy<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            initial: AtomicU32::new(0),
            scheduled: AtomicU32::new(0),
            successes: AtomicU32::new(0),
        }
    }

    pub fn counts(&self) -> (u32, u32, u32) {
        (
            self.initial.load(Ordering::SeqCst),
            self.scheduled.load(Ordering::SeqCst),
            self.successes.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl<S: RetryStrategy> RetryStrategy for CountingStrategy<S> {
    async fn acquire_initial_token(
        &self,
        partition: &str,
    ) -> Result<siumai_runtime::retry::RetryToken, siumai_runtime::retry::RetryError> {
        self.initial.fetch_add(1, Ordering::SeqCst);
        self.inner.acquire_initial_token(partition).await
    }

    async fn schedule_retry(
        &self,
        token: siumai_runtime::retry::RetryToken,
        error: &siumai_runtime::retry::ErrorInfo,
    ) -> Result<siumai_runtime::retry::RetryToken, siumai_runtime::retry::RetryError> {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.inner.schedule_retry(token, error).await
    }

    fn record_success(&self, token: siumai_runtime::retry::RetryToken) {
        self.successes.fetch_add(1, Ordering::SeqCst);
        self.inner.record_success(token);
    }

    fn max_attempts(&self) -> u32 {
        self.inner.max_attempts()
    }
}

pub const TICK: Duration = Duration::from_millis(1);
