use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::TurnInfo;

/// One in-flight turn.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TurnResponse {
    pub turn_id: String,
    pub session_id: String,
    pub user_id: String,
    pub started_at: String,
}

impl TurnInfo {
    pub fn to_response(&self) -> TurnResponse {
        TurnResponse {
            turn_id: self.turn_id.clone(),
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            started_at: self.started_at.to_rfc3339(),
        }
    }
}
