//! Turn relay pipeline.
//!
//! A turn flows through [`validate`], [`session`], [`notify`] (new
//! conversations only), the upstream completion call, and finally
//! [`pump`], which reframes the upstream body into client frames and hands
//! a completed reply to [`persist`].
//!
//! [`start_turn`] does everything that can still fail with an ordinary error
//! response. [`spawn_turn`] moves the rest into a background task whose
//! frames arrive through a bounded channel.

pub mod notify;
pub mod persist;
pub mod pump;
pub mod session;
pub mod validate;


use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::entities::{AgentStore, ChatStore, SessionStore};
use crate::error::ServerError;
use crate::state::{TurnInfo, TurnRegistry};
use crate::upstream::{ByteStream, CompletionRequest, HistoryTurn, Upstream};

pub use pump::TurnOutcome;
pub use validate::{Turn, TurnOrigin, validate_turn};

/// Frames buffered between the turn task and the client body.
const FRAME_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct TurnSettings {
    /// Include earlier messages of a continuing conversation in the
    /// completion request.
    pub history_replay: bool,
}

/// A turn whose upstream stream is open and ready to be pumped.
pub struct PreparedTurn {
    pub turn_id: String,
    pub session_id: String,
    pub user_id: String,
    pub is_new: bool,
    pub body: ByteStream,
}

impl std::fmt::Debug for PreparedTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedTurn")
            .field("turn_id", &self.turn_id)
            .field("session_id", &self.session_id)
            .field("is_new", &self.is_new)
            .finish_non_exhaustive()
    }
}

/// Resolve the session, brief the upstream on a new conversation and open
/// the completion stream.
pub async fn start_turn<S, U>(
    store: &S,
    upstream: &U,
    turn: Turn,
    settings: TurnSettings,
) -> Result<PreparedTurn, ServerError>
where
    S: SessionStore + ChatStore + AgentStore,
    U: Upstream,
{
    let resolved = session::resolve_session(store, &turn).await?;

    if resolved.is_new {
        notify::notify_conversation_opened(store, upstream, &turn, &resolved.session_id).await;
    }

    let history = if settings.history_replay && !resolved.is_new {
        store
            .list_messages(&resolved.session_id)
            .await?
            .into_iter()
            .filter(|m| m.id != resolved.user_message_id)
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content,
            })
            .collect()
    } else {
        Vec::new()
    };

    let request = CompletionRequest {
        user_id: turn.user_id.clone(),
        agent_id: turn.agent_id.clone(),
        conversation_id: resolved.session_id.clone(),
        documents: turn.document_urls(),
        message: turn.message,
        model: turn.model,
        instructions: turn.instructions,
        web_search: turn.web_search,
        history,
    };
    let body = upstream.stream_completion(&request).await?;

    Ok(PreparedTurn {
        turn_id: Uuid::new_v4().to_string(),
        session_id: resolved.session_id,
        user_id: turn.user_id,
        is_new: resolved.is_new,
        body,
    })
}

/// Run `prepared` on its own task and register it in `registry` until it
/// ends.
///
/// The receiver yields canonical client frames and closes when the turn is
/// over. Dropping it aborts the turn without persisting anything.
pub fn spawn_turn<S>(
    store: Arc<S>,
    prepared: PreparedTurn,
    registry: Arc<TurnRegistry>,
) -> (mpsc::Receiver<Bytes>, JoinHandle<TurnOutcome>)
where
    S: SessionStore + ChatStore,
{
    let PreparedTurn {
        turn_id,
        session_id,
        user_id,
        is_new,
        body,
    } = prepared;

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    let (registered_tx, registered_rx) = oneshot::channel::<()>();
    let span = info_span!("turn", turn_id = %turn_id, session_id = %session_id);

    let task = {
        let registry = registry.clone();
        let turn_id = turn_id.clone();
        let session_id = session_id.clone();
        let announce = is_new.then(|| session_id.clone());
        async move {
            // The entry must exist before it can be removed.
            let _ = registered_rx.await;
            info!("turn started");
            let outcome = pump::run_turn(&*store, &session_id, body, tx, announce).await;
            registry.remove(&turn_id);
            outcome
        }
        .instrument(span)
    };
    let handle = tokio::spawn(task);

    registry.insert(
        TurnInfo {
            turn_id,
            session_id,
            user_id,
            started_at: Utc::now(),
        },
        handle.abort_handle(),
    );
    let _ = registered_tx.send(());

    (rx, handle)
}
