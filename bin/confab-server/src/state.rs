//! Shared application state injected into every Axum handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::entities::AnyStore;
use crate::upstream::HttpUpstream;

/// Snapshot of one in-flight turn.
#[derive(Debug, Clone)]
pub struct TurnInfo {
    pub turn_id: String,
    pub session_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
}

struct TurnEntry {
    info: TurnInfo,
    handle: tokio::task::AbortHandle,
}

/// Tracks in-flight turn tasks, keyed by turn ID.
#[derive(Default)]
pub struct TurnRegistry {
    turns: Mutex<HashMap<String, TurnEntry>>,
}

impl std::fmt::Debug for TurnRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.turns.lock().map(|t| t.len()).unwrap_or(0);
        write!(f, "TurnRegistry({count} turns)")
    }
}

impl TurnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, info: TurnInfo, handle: tokio::task::AbortHandle) {
        if let Ok(mut map) = self.turns.lock() {
            map.insert(info.turn_id.clone(), TurnEntry { info, handle });
        }
    }

    /// Abort and remove a turn. Returns `true` if the turn was in flight.
    pub fn cancel(&self, turn_id: &str) -> bool {
        if let Ok(mut map) = self.turns.lock() {
            if let Some(entry) = map.remove(turn_id) {
                entry.handle.abort();
                return true;
            }
        }
        false
    }

    pub fn remove(&self, turn_id: &str) {
        if let Ok(mut map) = self.turns.lock() {
            map.remove(turn_id);
        }
    }

    /// In-flight turns, oldest first.
    pub fn list(&self) -> Vec<TurnInfo> {
        let mut turns: Vec<TurnInfo> = self
            .turns
            .lock()
            .map(|map| map.values().map(|e| e.info.clone()).collect())
            .unwrap_or_default();
        turns.sort_by_key(|t| t.started_at);
        turns
    }
}

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Conversation store.
    pub store: Arc<AnyStore>,
    /// Upstream completion service.
    pub upstream: Arc<HttpUpstream>,
    /// In-flight turn tasks.
    pub turns: Arc<TurnRegistry>,
}
