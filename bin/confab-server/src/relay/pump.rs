//! Per-turn pull loop: upstream bytes in, canonical frames out.

use bytes::Bytes;
use confab_sse::{RelayEvent, SseReframer};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::entities::{ChatStore, SessionStore};
use crate::relay::persist::write_reply;
use crate::upstream::ByteStream;

/// Client-facing message for a transport failure mid-stream.
const STREAM_FAILED: &str = "upstream stream failed";

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Terminal `done` (received or synthesized); carries the full reply.
    Completed { content: String },
    /// Upstream `error` event or transport failure mid-stream.
    Failed { reason: String },
    /// The client went away before the turn finished.
    Aborted,
}

/// Send one frame; `false` once the client is gone.
async fn send(tx: &mpsc::Sender<Bytes>, event: &RelayEvent) -> bool {
    tx.send(event.to_frame()).await.is_ok()
}

/// Apply one classified event. Returns the outcome once the turn is over.
async fn forward(tx: &mpsc::Sender<Bytes>, reply: &mut String, event: RelayEvent) -> Option<TurnOutcome> {
    match event {
        RelayEvent::Content(ref text) => {
            if !send(tx, &event).await {
                return Some(TurnOutcome::Aborted);
            }
            reply.push_str(text);
            None
        }
        RelayEvent::ConversationId(id) => {
            debug!(upstream_id = %id, "dropping upstream conversation_id event");
            None
        }
        RelayEvent::Passthrough(_) => (!send(tx, &event).await).then_some(TurnOutcome::Aborted),
        RelayEvent::Done => Some(if send(tx, &event).await {
            TurnOutcome::Completed {
                content: std::mem::take(reply),
            }
        } else {
            TurnOutcome::Aborted
        }),
        RelayEvent::Error(ref message) => {
            let reason = message.clone();
            if !send(tx, &event).await {
                return Some(TurnOutcome::Aborted);
            }
            Some(TurnOutcome::Failed { reason })
        }
    }
}

/// Reframe `body` into `tx` until a terminal event, end of stream, or
/// client disconnect.
///
/// `announce` is the id of a freshly created conversation; it goes out as the
/// first frame. Returning drops `tx`, which closes the client stream.
pub async fn pump(mut body: ByteStream, tx: mpsc::Sender<Bytes>, announce: Option<String>) -> TurnOutcome {
    let mut reframer = SseReframer::new();
    let mut reply = String::new();

    if let Some(id) = announce {
        if !send(&tx, &RelayEvent::ConversationId(id)).await {
            return TurnOutcome::Aborted;
        }
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => return TurnOutcome::Aborted,
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for event in reframer.push(&chunk) {
                    if let Some(outcome) = forward(&tx, &mut reply, RelayEvent::classify(&event)).await {
                        return outcome;
                    }
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "upstream stream failed mid-turn");
                // The client learns that the stream broke, not where.
                send(&tx, &RelayEvent::Error(STREAM_FAILED.to_owned())).await;
                return TurnOutcome::Failed { reason: e.to_string() };
            }
            None => {
                for event in reframer.finish() {
                    if let Some(outcome) = forward(&tx, &mut reply, RelayEvent::classify(&event)).await {
                        return outcome;
                    }
                }
                debug!("upstream ended without a terminal event; synthesizing done");
                return forward(&tx, &mut reply, RelayEvent::Done)
                    .await
                    .unwrap_or(TurnOutcome::Aborted);
            }
        }
    }
}

/// Run a whole turn: pump, close the client stream, then persist the reply
/// of a completed turn.
pub async fn run_turn<S>(
    store: &S,
    session_id: &str,
    body: ByteStream,
    tx: mpsc::Sender<Bytes>,
    announce: Option<String>,
) -> TurnOutcome
where
    S: SessionStore + ChatStore,
{
    // `pump` owns `tx`; the client sees end-of-stream before any write below.
    let outcome = pump(body, tx, announce).await;

    match &outcome {
        TurnOutcome::Completed { content } => {
            if let Err(e) = write_reply(store, session_id, content).await {
                error!(session_id, error = %e, "failed to persist assistant reply");
            } else {
                info!(session_id, reply_len = content.len(), "turn completed");
            }
        }
        TurnOutcome::Failed { reason } => {
            warn!(session_id, reason = %reason, "turn failed; reply discarded");
        }
        TurnOutcome::Aborted => {
            info!(session_id, "client disconnected; partial reply discarded");
        }
    }
    outcome
}
