//! Chat turn request body, shared by the user-facing and admin routes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::entities::FileAttachment;

/// Request body for `POST /v1/chat` and `POST /admin/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_turn_content"))]
pub struct ChatTurnRequest {
    /// The user's message; may be empty when files are attached.
    #[serde(default)]
    pub message: String,
    /// Agent configuration answering this conversation.
    #[validate(required(message = "agent_id is required"))]
    pub agent_id: Option<String>,
    /// Existing conversation to continue; omit to start a new one.
    #[serde(default, alias = "session_id")]
    pub conversation_id: Option<String>,
    /// Attachment manifest; files are already uploaded elsewhere.
    #[serde(default)]
    #[validate(nested)]
    pub files: Vec<FileAttachment>,
    /// Let the upstream service consult web search.
    #[serde(default)]
    pub web_search: bool,
    /// Free-text system instructions.
    #[serde(default)]
    pub instructions: String,
    /// Model name; the server default applies when omitted.
    #[serde(default)]
    pub model: Option<String>,
}

fn validate_turn_content(req: &ChatTurnRequest) -> Result<(), ValidationError> {
    if req.message.trim().is_empty() && req.files.is_empty() {
        let mut err = ValidationError::new("empty_turn");
        err.message = Some(Cow::Borrowed(
            "message must not be empty when no files are attached",
        ));
        return Err(err);
    }
    Ok(())
}
