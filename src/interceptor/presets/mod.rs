//! Ready-made interceptors

mod headers;
mod logging;

pub use headers::{
    ContentLengthInterceptor, INVOCATION_ID_HEADER, InvocationIdInterceptor, REQUEST_INFO_HEADER,
    RETRY_ATTEMPT_HEADER, RequestAttemptInterceptor,
};
pub use logging::LoggingInterceptor;
