//! Upstream completion service.
//!
//! [`Upstream`] is the seam between the relay and the service that actually
//! generates replies. [`HttpUpstream`] is the production implementation; the
//! relay tests drive the pipeline with a scripted stand-in.

pub mod http;
pub mod payload;

use std::future::Future;

use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub use http::HttpUpstream;
pub use payload::{CompletionRequest, ConversationSchema, HistoryTurn, OpenConversationRequest};

/// Raw response body of a completion request.
pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection could not be established or the request could not be sent.
    #[error("upstream unreachable: {0}")]
    Unavailable(String),

    /// Non-success HTTP status.
    #[error("upstream returned status {status}")]
    Status { status: u16, body: String },

    /// The body stream failed after the response started.
    #[error("upstream stream failed: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Unavailable(e.to_string())
    }
}

pub trait Upstream: Send + Sync + 'static {
    /// One-time "conversation opened" briefing for a new session.
    fn open_conversation(
        &self,
        request: &OpenConversationRequest,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send;

    /// Issue a completion request and hand back its body as a byte stream.
    fn stream_completion(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<ByteStream, UpstreamError>> + Send;
}
