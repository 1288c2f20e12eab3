//! One-time "conversation opened" briefing for new sessions.
//!
//! Best effort: every failure is logged and swallowed so the user can
//! always chat, at worst without the agent's knowledge base.

use serde_json::Map;
use tracing::{debug, info, warn};

use crate::entities::AgentStore;
use crate::relay::validate::Turn;
use crate::upstream::{ConversationSchema, OpenConversationRequest, Upstream};

/// Build the briefing for `session_id` from the agent's stored configuration.
pub async fn conversation_briefing<S: AgentStore>(
    store: &S,
    turn: &Turn,
    session_id: &str,
) -> OpenConversationRequest {
    let agent_name = match store.get_agent(&turn.agent_id).await {
        Ok(Some(agent)) => {
            debug!(agent_id = %agent.id, name = %agent.name, "agent loaded");
            agent.name
        }
        Ok(None) => {
            warn!(agent_id = %turn.agent_id, "agent not found; briefing upstream without a display name");
            turn.agent_id.clone()
        }
        Err(e) => {
            warn!(agent_id = %turn.agent_id, error = %e, "failed to load agent");
            turn.agent_id.clone()
        }
    };

    let document_urls = match store.list_agent_documents(&turn.agent_id).await {
        Ok(documents) => documents
            .into_iter()
            .map(|d| {
                debug!(document = %d.name, url = %d.url, "briefing document");
                d.url
            })
            .collect(),
        Err(e) => {
            warn!(agent_id = %turn.agent_id, error = %e, "failed to load agent documents");
            Vec::new()
        }
    };

    OpenConversationRequest {
        user_id: turn.user_id.clone(),
        agent_id: turn.agent_id.clone(),
        agent_name,
        conversation_id: session_id.to_owned(),
        document_urls,
        use_hybrid_search: true,
        schema: ConversationSchema {
            model: turn.model.clone(),
            instructions: turn.instructions.clone(),
        },
        credentials: Map::new(),
    }
}

/// Brief the upstream service on a new conversation.
///
/// Returns whether the upstream acknowledged; callers proceed either way.
pub async fn notify_conversation_opened<S, U>(store: &S, upstream: &U, turn: &Turn, session_id: &str) -> bool
where
    S: AgentStore,
    U: Upstream,
{
    let briefing = conversation_briefing(store, turn, session_id).await;
    match upstream.open_conversation(&briefing).await {
        Ok(()) => {
            info!(
                session_id,
                documents = briefing.document_urls.len(),
                "upstream briefed on new conversation"
            );
            true
        }
        Err(e) => {
            warn!(session_id, error = %e, "conversation-opened notification failed; continuing without it");
            false
        }
    }
}
