//! Message bodies
//!
//! A body is absent, an in-memory buffer, or a streaming source. Streaming
//! sources are factories so a retried attempt can open a fresh stream instead of
//! reusing one a previous attempt may have partially consumed.

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt, stream};

use crate::error::BoxError;

/// Stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

type StreamFactory = dyn Fn() -> ByteStream + Send + Sync;

/// Replayable producer of body streams.
#[derive(Clone)]
pub struct StreamSource {
    factory: Arc<StreamFactory>,
    content_length: Option<u64>,
}

impl StreamSource {
    /// Create a source that opens a new stream on every call.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> ByteStream + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            content_length: None,
        }
    }

    /// Wrap a single-use stream. Opening it a second time yields an error chunk.
    pub fn once(stream: ByteStream) -> Self {
        let slot = Mutex::new(Some(stream));
        Self::new(move || {
            let taken = slot.lock().ok().and_then(|mut guard| guard.take());
            match taken {
                Some(stream) => stream,
                None => {
                    let err: BoxError = "stream body was already consumed".into();
                    stream::once(async move { Err(err) }).boxed()
                }
            }
        })
    }

    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Open a new stream from this source.
    pub fn open(&self) -> ByteStream {
        (self.factory)()
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Request or response payload.
#[derive(Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Stream(StreamSource),
}

impl Body {
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }

    /// Length in bytes when known without reading the body.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::Stream(source) => source.content_length(),
        }
    }

    /// In-memory contents; `None` for streaming bodies.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Empty => Some(&[]),
            Self::Bytes(bytes) => Some(bytes.as_ref()),
            Self::Stream(_) => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Open the body as a stream of chunks.
    pub fn to_stream(&self) -> ByteStream {
        match self {
            Self::Empty => stream::empty().boxed(),
            Self::Bytes(bytes) => {
                let bytes = bytes.clone();
                stream::once(async move { Ok(bytes) }).boxed()
            }
            Self::Stream(source) => source.open(),
        }
    }

    /// Read the whole body into memory.
    pub async fn collect(&self) -> Result<Bytes, BoxError> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Stream(source) => {
                let buf = source
                    .open()
                    .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok(acc)
                    })
                    .await?;
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Body::Empty"),
            Self::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
            Self::Stream(source) => write!(f, "Body::Stream({source:?})"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<StreamSource> for Body {
    fn from(source: StreamSource) -> Self {
        Self::Stream(source)
    }
}
