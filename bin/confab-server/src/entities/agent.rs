use std::future::Future;

use crate::entities::AnyStore;
use crate::entities::dao::{Agent, AgentDocument};

/// Read-only view of agent configuration.
pub trait AgentStore: Send + Sync + 'static {
    fn get_agent(&self, id: &str) -> impl Future<Output = Result<Option<Agent>, sqlx::Error>> + Send;
    fn list_agent_documents(
        &self,
        agent_id: &str,
    ) -> impl Future<Output = Result<Vec<AgentDocument>, sqlx::Error>> + Send;
}

impl AgentStore for AnyStore {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, sqlx::Error> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, name FROM agents WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| Agent { id, name }))
    }

    async fn list_agent_documents(&self, agent_id: &str) -> Result<Vec<AgentDocument>, sqlx::Error> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT name, url FROM agent_documents WHERE agent_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(name, url)| AgentDocument { name, url })
            .collect())
    }
}

#[cfg(test)]
impl AnyStore {
    /// Seed an agent and its documents; agent rows are owned by the console.
    pub async fn seed_agent(&self, id: &str, name: &str, documents: &[(&str, &str)]) {
        let now = crate::entities::encode_ts(chrono::Utc::now());
        sqlx::query("INSERT INTO agents (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(name)
            .bind(&now)
            .execute(&self.pool)
            .await
            .expect("insert agent");
        for (doc_name, url) in documents {
            sqlx::query(
                "INSERT INTO agent_documents (id, agent_id, name, url, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(id)
            .bind(*doc_name)
            .bind(*url)
            .bind(&now)
            .execute(&self.pool)
            .await
            .expect("insert agent document");
        }
    }
}
