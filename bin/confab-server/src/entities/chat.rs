use std::future::Future;

use crate::entities::dao::{ChatMessage, FileAttachment, MessageRole};
use crate::entities::{AnyStore, decode_ts, encode_ts};

pub trait ChatStore: Send + Sync + 'static {
    fn append_message(
        &self,
        msg: ChatMessage,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// All messages of a session, oldest first.
    fn list_messages(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;
}

type MessageRow = (String, String, String, String, Option<String>, String);

impl ChatStore for AnyStore {
    async fn append_message(&self, msg: ChatMessage) -> Result<(), sqlx::Error> {
        let files = msg
            .files
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, role, content, files, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&msg.id)
        .bind(&msg.session_id)
        .bind(msg.role.as_str())
        .bind(&msg.content)
        .bind(files)
        .bind(encode_ts(msg.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, sqlx::Error> {
        // rowid breaks ties between messages written within the same microsecond.
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, session_id, role, content, files, created_at \
             FROM chat_messages WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(id, session_id, role, content, files, created_at)| {
                let role = role
                    .parse::<MessageRole>()
                    .map_err(|e| sqlx::Error::Decode(e.into()))?;
                let files = files
                    .map(|raw| serde_json::from_str::<Vec<FileAttachment>>(&raw))
                    .transpose()
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
                Ok(ChatMessage {
                    id,
                    session_id,
                    role,
                    content,
                    files,
                    created_at: decode_ts(&created_at, "chat_messages.created_at"),
                })
            })
            .collect()
    }
}
