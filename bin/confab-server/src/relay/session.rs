//! Session resolution and the user-message write.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::{ChatMessage, ChatSession, ChatStore, MessageRole, SessionStore};
use crate::error::ServerError;
use crate::relay::validate::{Turn, TurnOrigin};

/// Outcome of [`resolve_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session_id: String,
    /// First turn of the conversation; the upstream must be briefed.
    pub is_new: bool,
    /// Id of the user message written for this turn.
    pub user_message_id: String,
}

/// Map `turn` to a session row, creating one for a new conversation, then
/// record the user's message.
///
/// A continuing conversation must exist, and a user-facing turn must own it.
pub async fn resolve_session<S>(store: &S, turn: &Turn) -> Result<ResolvedSession, ServerError>
where
    S: SessionStore + ChatStore,
{
    let now = Utc::now();

    let (session_id, is_new) = match turn.conversation_id.as_deref() {
        None => {
            let session = ChatSession {
                id: Uuid::new_v4().to_string(),
                user_id: turn.user_id.clone(),
                agent_id: turn.agent_id.clone(),
                model: turn.model.clone(),
                created_at: now,
                last_activity_at: now,
            };
            store.create_session(session.clone()).await?;
            info!(session_id = %session.id, agent_id = %session.agent_id, "conversation created");
            (session.id, true)
        }
        Some(id) => {
            let session = store
                .get_session(id)
                .await?
                .ok_or_else(|| ServerError::NotFound(format!("conversation '{id}' not found")))?;
            if turn.origin == TurnOrigin::User && session.user_id != turn.user_id {
                return Err(ServerError::Forbidden(format!(
                    "conversation '{id}' belongs to another user"
                )));
            }
            debug!(session_id = %session.id, "continuing conversation");
            (session.id, false)
        }
    };

    let user_message_id = Uuid::new_v4().to_string();
    store
        .append_message(ChatMessage {
            id: user_message_id.clone(),
            session_id: session_id.clone(),
            role: MessageRole::User,
            content: turn.message.clone(),
            files: (!turn.files.is_empty()).then(|| turn.files.clone()),
            created_at: now,
        })
        .await?;

    Ok(ResolvedSession {
        session_id,
        is_new,
        user_message_id,
    })
}
