//! JSON bodies sent to the upstream service.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::entities::MessageRole;

/// Body of the session-initialization call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OpenConversationRequest {
    pub user_id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub conversation_id: String,
    /// Knowledge-base document URLs of the agent, flattened.
    pub document_urls: Vec<String>,
    pub use_hybrid_search: bool,
    pub schema: ConversationSchema,
    /// Reserved by the upstream contract; always empty.
    pub credentials: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConversationSchema {
    pub model: String,
    pub instructions: String,
}

/// Body of the completion call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub user_id: String,
    pub agent_id: String,
    pub conversation_id: String,
    pub message: String,
    /// Attached-file URLs, flattened.
    pub documents: Vec<String>,
    pub model: String,
    pub instructions: String,
    pub web_search: bool,
    pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryTurn {
    pub role: MessageRole,
    pub content: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn open_conversation_wire_shape() {
        let req = OpenConversationRequest {
            user_id: "u-1".into(),
            agent_id: "a-1".into(),
            agent_name: "Helper".into(),
            conversation_id: "c-1".into(),
            document_urls: vec!["https://kb/doc.pdf".into()],
            use_hybrid_search: true,
            schema: ConversationSchema {
                model: "m".into(),
                instructions: "be brief".into(),
            },
            credentials: Map::new(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "user_id": "u-1",
                "agent_id": "a-1",
                "agent_name": "Helper",
                "conversation_id": "c-1",
                "document_urls": ["https://kb/doc.pdf"],
                "use_hybrid_search": true,
                "schema": { "model": "m", "instructions": "be brief" },
                "credentials": {},
            })
        );
    }

    #[test]
    fn history_roles_are_lowercase() {
        let turn = HistoryTurn {
            role: MessageRole::Assistant,
            content: "hi".into(),
        };
        assert_eq!(
            serde_json::to_value(&turn).unwrap(),
            json!({ "role": "assistant", "content": "hi" })
        );
    }
}
