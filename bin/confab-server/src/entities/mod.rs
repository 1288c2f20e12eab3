//! Conversation store.
//!
//! [`SessionStore`], [`ChatStore`] and [`AgentStore`] define what the relay
//! needs from durable storage. The default implementation is [`AnyStore`],
//! a sqlx `Any` pool (SQLite in practice). To swap databases, implement the
//! traits for a new type; the relay pipeline is generic over them.
//!
//! All trait methods use `impl Future` in their signatures (stable since Rust
//! 1.75) so no extra `async-trait` crate is required.

pub mod agent;
pub mod chat;
pub mod dao;
pub mod session;

pub use dao::{Agent, AgentDocument, ChatMessage, ChatSession, FileAttachment, MessageRole};

pub use agent::AgentStore;
pub use chat::ChatStore;
pub use session::SessionStore;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::any::AnyPoolOptions;

#[derive(Clone, Debug)]
pub struct AnyStore {
    pool: sqlx::Pool<sqlx::Any>,
}

impl AnyStore {
    /// Open (or create) the database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible URL, e.g. `"sqlite://confab.db?mode=rwc"`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        sqlx::any::install_default_drivers();
        let options = sqlx::any::AnyConnectOptions::from_str(url)?;
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Round-trip a trivial query to prove the database answers.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Private in-memory database; one connection so every query sees it.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        sqlx::any::install_default_drivers();
        let options = sqlx::any::AnyConnectOptions::from_str("sqlite::memory:")
            .expect("valid in-memory url");
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("open in-memory database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");
        Self { pool }
    }
}

/// Timestamps are stored as fixed-precision RFC 3339 text so that lexical
/// order in SQL equals chronological order.
pub(crate) fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_ts(raw: &str, column: &'static str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, column, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}
