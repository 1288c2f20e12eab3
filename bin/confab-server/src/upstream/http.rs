//! reqwest-backed [`Upstream`].

use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use reqwest::header::ACCEPT;
use tracing::debug;

use super::{ByteStream, CompletionRequest, OpenConversationRequest, Upstream, UpstreamError};

/// Session-initialization endpoint, relative to the upstream base URL.
pub const SESSION_INIT_PATH: &str = "/session/init";
/// Streaming completion endpoint, relative to the upstream base URL.
pub const COMPLETION_PATH: &str = "/chat/stream";

/// Error bodies are logged, so keep them short.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Clone, Debug)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    /// Build a client for `base_url`.
    ///
    /// Only connection establishment is bounded by `connect_timeout`; an open
    /// stream may stay idle indefinitely.
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Upstream for HttpUpstream {
    async fn open_conversation(&self, request: &OpenConversationRequest) -> Result<(), UpstreamError> {
        let resp = self
            .client
            .post(self.url(SESSION_INIT_PATH))
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: error_body(resp).await,
            });
        }
        debug!(conversation_id = %request.conversation_id, "upstream acknowledged conversation");
        Ok(())
    }

    async fn stream_completion(&self, request: &CompletionRequest) -> Result<ByteStream, UpstreamError> {
        let resp = self
            .client
            .post(self.url(COMPLETION_PATH))
            .header(ACCEPT, confab_sse::CONTENT_TYPE)
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: error_body(resp).await,
            });
        }
        Ok(resp
            .bytes_stream()
            .map_err(|e| UpstreamError::Stream(e.to_string()))
            .boxed())
    }
}

/// Leading text of an error body. Reading stops once enough bytes are in to
/// cover [`MAX_ERROR_BODY_CHARS`].
async fn error_body(resp: reqwest::Response) -> String {
    let byte_limit = MAX_ERROR_BODY_CHARS * 4;
    let mut raw: Vec<u8> = Vec::new();
    let mut chunks = std::pin::pin!(resp.bytes_stream());
    while raw.len() < byte_limit {
        match chunks.next().await {
            Some(Ok(chunk)) => raw.extend_from_slice(&chunk),
            Some(Err(e)) if raw.is_empty() => return format!("<unreadable body: {e}>"),
            Some(Err(_)) | None => break,
        }
    }
    String::from_utf8_lossy(&raw)
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect()
}
