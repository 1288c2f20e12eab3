use std::future::Future;

use chrono::{DateTime, Utc};

use crate::entities::{AnyStore, dao::ChatSession, decode_ts, encode_ts};

pub trait SessionStore: Send + Sync + 'static {
    fn create_session(&self, session: ChatSession) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_session(&self, id: &str) -> impl Future<Output = Result<Option<ChatSession>, sqlx::Error>> + Send;
    /// Refresh `last_activity_at`; last writer wins.
    fn touch_session(&self, id: &str, at: DateTime<Utc>) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

type SessionRow = (String, String, String, String, String, String);

fn from_row((id, user_id, agent_id, model, created_at, last_activity_at): SessionRow) -> ChatSession {
    ChatSession {
        id,
        user_id,
        agent_id,
        model,
        created_at: decode_ts(&created_at, "chat_sessions.created_at"),
        last_activity_at: decode_ts(&last_activity_at, "chat_sessions.last_activity_at"),
    }
}

impl SessionStore for AnyStore {
    async fn create_session(&self, session: ChatSession) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO chat_sessions (id, user_id, agent_id, model, created_at, last_activity_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.agent_id)
        .bind(&session.model)
        .bind(encode_ts(session.created_at))
        .bind(encode_ts(session.last_activity_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, user_id, agent_id, model, created_at, last_activity_at \
             FROM chat_sessions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn touch_session(&self, id: &str, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE chat_sessions SET last_activity_at = ?1 WHERE id = ?2")
            .bind(encode_ts(at))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
impl AnyStore {
    /// Sessions of `user_id`, most recently active first.
    pub async fn list_user_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, sqlx::Error> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT id, user_id, agent_id, model, created_at, last_activity_at \
             FROM chat_sessions WHERE user_id = ?1 ORDER BY last_activity_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }
}
