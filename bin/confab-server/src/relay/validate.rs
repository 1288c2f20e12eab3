//! Turn validation. Pure: no store or network access.

use validator::Validate;

use crate::entities::FileAttachment;
use crate::error::ServerError;
use crate::schemas::v1::chat::ChatTurnRequest;

/// Which call site a turn came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOrigin {
    /// End user; may only continue conversations they own.
    User,
    /// Management console playground; may continue any conversation.
    Admin,
}

/// A structurally valid chat turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub origin: TurnOrigin,
    pub user_id: String,
    pub agent_id: String,
    pub conversation_id: Option<String>,
    pub message: String,
    pub files: Vec<FileAttachment>,
    pub web_search: bool,
    pub instructions: String,
    pub model: String,
}

impl Turn {
    /// URLs of the attached files, in manifest order.
    pub fn document_urls(&self) -> Vec<String> {
        self.files.iter().map(|f| f.url.clone()).collect()
    }
}

/// Check `req` and bind it to the caller's identity.
pub fn validate_turn(
    req: ChatTurnRequest,
    user_id: String,
    origin: TurnOrigin,
    default_model: &str,
) -> Result<Turn, ServerError> {
    req.validate()?;

    let agent_id = req
        .agent_id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServerError::Validation("agent_id is required".into()))?;

    let conversation_id = req
        .conversation_id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty());

    let model = req
        .model
        .map(|m| m.trim().to_owned())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_model.to_owned());

    Ok(Turn {
        origin,
        user_id,
        agent_id,
        conversation_id,
        message: req.message,
        files: req.files,
        web_search: req.web_search,
        instructions: req.instructions,
        model,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn request(message: &str, agent_id: Option<&str>) -> ChatTurnRequest {
        ChatTurnRequest {
            message: message.into(),
            agent_id: agent_id.map(Into::into),
            ..Default::default()
        }
    }

    fn attachment(url: &str) -> FileAttachment {
        FileAttachment {
            name: "report.pdf".into(),
            url: url.into(),
            size: 1024,
            mime_type: "application/pdf".into(),
        }
    }

    fn is_validation(result: Result<Turn, ServerError>) -> bool {
        matches!(result, Err(ServerError::Validation(_)))
    }

    #[test]
    fn accepts_plain_message() {
        let turn = validate_turn(request("hi", Some("a-1")), "u-1".into(), TurnOrigin::User, "default")
            .expect("valid turn");
        assert_eq!(turn.agent_id, "a-1");
        assert_eq!(turn.model, "default");
        assert!(turn.conversation_id.is_none());
    }

    #[test]
    fn rejects_whitespace_message_without_files() {
        assert!(is_validation(validate_turn(
            request("  \n\t", Some("a-1")),
            "u".into(),
            TurnOrigin::User,
            "m"
        )));
    }

    #[test]
    fn accepts_empty_message_with_files() {
        let mut req = request("", Some("a-1"));
        req.files = vec![attachment("https://files.example/report.pdf")];
        let turn = validate_turn(req, "u".into(), TurnOrigin::User, "m").expect("valid turn");
        assert_eq!(turn.document_urls(), vec!["https://files.example/report.pdf"]);
    }

    #[test]
    fn rejects_missing_or_blank_agent() {
        assert!(is_validation(validate_turn(request("hi", None), "u".into(), TurnOrigin::User, "m")));
        assert!(is_validation(validate_turn(request("hi", Some("   ")), "u".into(), TurnOrigin::User, "m")));
    }

    #[test]
    fn rejects_attachment_with_bad_url() {
        let mut req = request("see file", Some("a-1"));
        req.files = vec![attachment("not a url")];
        assert!(is_validation(validate_turn(req, "u".into(), TurnOrigin::User, "m")));
    }

    #[test]
    fn blank_conversation_id_means_new_conversation() {
        let mut req = request("hi", Some("a-1"));
        req.conversation_id = Some(" ".into());
        let turn = validate_turn(req, "u".into(), TurnOrigin::User, "m").unwrap();
        assert!(turn.conversation_id.is_none());
    }

    #[test]
    fn explicit_model_wins_over_default() {
        let mut req = request("hi", Some("a-1"));
        req.model = Some("large".into());
        let turn = validate_turn(req, "u".into(), TurnOrigin::Admin, "default").unwrap();
        assert_eq!(turn.model, "large");
        assert_eq!(turn.origin, TurnOrigin::Admin);
    }
}
