use chrono::{DateTime, Utc};

/// A row in the `chat_sessions` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub agent_id: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}
