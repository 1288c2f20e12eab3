//! Assistant-reply persistence.

use chrono::Utc;
use uuid::Uuid;

use crate::entities::{ChatMessage, ChatStore, MessageRole, SessionStore};

/// Write the single assistant message of a completed turn and refresh the
/// session's activity timestamp.
pub async fn write_reply<S>(store: &S, session_id: &str, content: &str) -> Result<(), sqlx::Error>
where
    S: SessionStore + ChatStore,
{
    let now = Utc::now();
    store
        .append_message(ChatMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_owned(),
            role: MessageRole::Assistant,
            content: content.to_owned(),
            files: None,
            created_at: now,
        })
        .await?;
    store.touch_session(session_id, now).await
}
