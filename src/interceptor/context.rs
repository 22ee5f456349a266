//! Execution context and per-hook views
//!
//! [`InterceptorContext`] owns everything one operation execution accumulates.
//! Hooks never see it directly: each hook receives a view that borrows only
//! the fields it may read, and mutably only the one field it may change. The
//! attributes bag is mutable from every hook.

use std::fmt;

use crate::attributes::Attributes;
use crate::operation::{Operation, OperationResult};

/// State of one operation execution.
///
/// `request`, `response` and `output_or_error` start empty and are filled in
/// as the pipeline advances. A field never goes back to empty within an
/// attempt; a new attempt replaces request, response and result together.
pub struct InterceptorContext<Op: Operation> {
    input: Op::Input,
    request: Option<Op::Request>,
    response: Option<Op::Response>,
    output_or_error: Option<OperationResult<Op>>,
    attributes: Attributes,
}

impl<Op: Operation> InterceptorContext<Op> {
    pub fn new(input: Op::Input) -> Self {
        Self::with_attributes(input, Attributes::new())
    }

    pub fn with_attributes(input: Op::Input, attributes: Attributes) -> Self {
        Self {
            input,
            request: None,
            response: None,
            output_or_error: None,
            attributes,
        }
    }

    pub fn input(&self) -> &Op::Input {
        &self.input
    }

    pub fn request(&self) -> Option<&Op::Request> {
        self.request.as_ref()
    }

    pub fn response(&self) -> Option<&Op::Response> {
        self.response.as_ref()
    }

    pub fn output_or_error(&self) -> Option<&OperationResult<Op>> {
        self.output_or_error.as_ref()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub(crate) fn input_and_attributes_mut(&mut self) -> (&Op::Input, &mut Attributes) {
        (&self.input, &mut self.attributes)
    }

    pub(crate) fn set_request(&mut self, request: Op::Request) {
        self.request = Some(request);
    }

    pub(crate) fn set_response(&mut self, response: Op::Response) {
        self.response = Some(response);
    }

    pub(crate) fn set_output_or_error(&mut self, result: OperationResult<Op>) {
        self.output_or_error = Some(result);
    }

    pub(crate) fn take_output_or_error(&mut self) -> Option<OperationResult<Op>> {
        self.output_or_error.take()
    }

    /// Start a new attempt with a fresh request; the previous attempt's
    /// response and result are dropped.
    pub(crate) fn begin_attempt(&mut self, request: Op::Request) {
        self.request = Some(request);
        self.response = None;
        self.output_or_error = None;
    }

    pub(crate) fn input_view(&mut self) -> InputContext<'_, Op> {
        InputContext {
            input: &self.input,
            attributes: &mut self.attributes,
        }
    }

    pub(crate) fn input_mut_view(&mut self) -> InputMutContext<'_, Op> {
        InputMutContext {
            input: &mut self.input,
            attributes: &mut self.attributes,
        }
    }

    pub(crate) fn request_view(&mut self) -> Option<RequestContext<'_, Op>> {
        Some(RequestContext {
            input: &self.input,
            request: self.request.as_ref()?,
            attributes: &mut self.attributes,
        })
    }

    pub(crate) fn request_mut_view(&mut self) -> Option<RequestMutContext<'_, Op>> {
        Some(RequestMutContext {
            input: &self.input,
            request: self.request.as_mut()?,
            attributes: &mut self.attributes,
        })
    }

    pub(crate) fn response_view(&mut self) -> Option<ResponseContext<'_, Op>> {
        Some(ResponseContext {
            input: &self.input,
            request: self.request.as_ref()?,
            response: self.response.as_ref()?,
            attributes: &mut self.attributes,
        })
    }

    pub(crate) fn response_mut_view(&mut self) -> Option<ResponseMutContext<'_, Op>> {
        Some(ResponseMutContext {
            input: &self.input,
            request: self.request.as_ref()?,
            response: self.response.as_mut()?,
            attributes: &mut self.attributes,
        })
    }

    pub(crate) fn output_view(&mut self) -> Option<OutputContext<'_, Op>> {
        Some(OutputContext {
            input: &self.input,
            request: self.request.as_ref(),
            response: self.response.as_ref(),
            output_or_error: self.output_or_error.as_ref()?,
            attributes: &mut self.attributes,
        })
    }

    pub(crate) fn output_mut_view(&mut self) -> Option<OutputMutContext<'_, Op>> {
        Some(OutputMutContext {
            input: &self.input,
            request: self.request.as_ref(),
            response: self.response.as_ref(),
            output_or_error: self.output_or_error.as_mut()?,
            attributes: &mut self.attributes,
        })
    }
}

impl<Op: Operation> fmt::Debug for InterceptorContext<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorContext")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("has_result", &self.output_or_error.is_some())
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// View for read-only hooks that run before serialization.
pub struct InputContext<'a, Op: Operation> {
    input: &'a Op::Input,
    attributes: &'a mut Attributes,
}

impl<Op: Operation> InputContext<'_, Op> {
    pub fn input(&self) -> &Op::Input {
        self.input
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.attributes
    }
}

/// View for `modify_before_serialization`: the input may be replaced.
pub struct InputMutContext<'a, Op: Operation> {
    input: &'a mut Op::Input,
    attributes: &'a mut Attributes,
}

impl<Op: Operation> InputMutContext<'_, Op> {
    pub fn input(&self) -> &Op::Input {
        self.input
    }

    pub fn input_mut(&mut self) -> &mut Op::Input {
        self.input
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.attributes
    }
}

/// View for read-only hooks once a request exists.
pub struct RequestContext<'a, Op: Operation> {
    input: &'a Op::Input,
    request: &'a Op::Request,
    attributes: &'a mut Attributes,
}

impl<Op: Operation> RequestContext<'_, Op> {
    pub fn input(&self) -> &Op::Input {
        self.input
    }

    pub fn request(&self) -> &Op::Request {
        self.request
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.attributes
    }
}

/// View for hooks that may mutate the request.
pub struct RequestMutContext<'a, Op: Operation> {
    input: &'a Op::Input,
    request: &'a mut Op::Request,
    attributes: &'a mut Attributes,
}

impl<Op: Operation> RequestMutContext<'_, Op> {
    pub fn input(&self) -> &Op::Input {
        self.input
    }

    pub fn request(&self) -> &Op::Request {
        self.request
    }

    pub fn request_mut(&mut self) -> &mut Op::Request {
        self.request
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.attributes
    }
}

/// View for read-only hooks once a response was received.
pub struct ResponseContext<'a, Op: Operation> {
    input: &'a Op::Input,
    request: &'a Op::Request,
    response: &'a Op::Response,
    attributes: &'a mut Attributes,
}

impl<Op: Operation> ResponseContext<'_, Op> {
    pub fn input(&self) -> &Op::Input {
        self.input
    }

    pub fn request(&self) -> &Op::Request {
        self.request
    }

    pub fn response(&self) -> &Op::Response {
        self.response
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.attributes
    }
}

/// View for `modify_before_deserialization`: the response may be rewritten.
pub struct ResponseMutContext<'a, Op: Operation> {
    input: &'a Op::Input,
    request: &'a Op::Request,
    response: &'a mut Op::Response,
    attributes: &'a mut Attributes,
}

impl<Op: Operation> ResponseMutContext<'_, Op> {
    pub fn input(&self) -> &Op::Input {
        self.input
    }

    pub fn request(&self) -> &Op::Request {
        self.request
    }

    pub fn response(&self) -> &Op::Response {
        self.response
    }

    pub fn response_mut(&mut self) -> &mut Op::Response {
        self.response
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.attributes
    }
}

/// View for read-only hooks that observe a result.
///
/// Request and response are absent when the operation failed before they
/// were produced.
pub struct OutputContext<'a, Op: Operation> {
    input: &'a Op::Input,
    request: Option<&'a Op::Request>,
    response: Option<&'a Op::Response>,
    output_or_error: &'a OperationResult<Op>,
    attributes: &'a mut Attributes,
}

impl<Op: Operation> OutputContext<'_, Op> {
    pub fn input(&self) -> &Op::Input {
        self.input
    }

    pub fn request(&self) -> Option<&Op::Request> {
        self.request
    }

    pub fn response(&self) -> Option<&Op::Response> {
        self.response
    }

    pub fn output_or_error(&self) -> &OperationResult<Op> {
        self.output_or_error
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.attributes
    }
}

/// View for hooks that may override the result.
pub struct OutputMutContext<'a, Op: Operation> {
    input: &'a Op::Input,
    request: Option<&'a Op::Request>,
    response: Option<&'a Op::Response>,
    output_or_error: &'a mut OperationResult<Op>,
    attributes: &'a mut Attributes,
}

impl<Op: Operation> OutputMutContext<'_, Op> {
    pub fn input(&self) -> &Op::Input {
        self.input
    }

    pub fn request(&self) -> Option<&Op::Request> {
        self.request
    }

    pub fn response(&self) -> Option<&Op::Response> {
        self.response
    }

    pub fn output_or_error(&self) -> &OperationResult<Op> {
        self.output_or_error
    }

    pub fn output_or_error_mut(&mut self) -> &mut OperationResult<Op> {
        self.output_or_error
    }

    pub fn attributes(&self) -> &Attributes {
        self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        self.attributes
    }
}
