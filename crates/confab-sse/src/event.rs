//! Relay event classification and the canonical client wire format.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::frame::{EVENT_DELIMITER, SseEvent};

/// Sentinel some completion services send instead of a JSON terminal event.
const DONE_SENTINEL: &str = "[DONE]";

/// Fallback message for an `error` event that carries none.
const UNSPECIFIED_ERROR: &str = "upstream reported an error";

/// One semantic occurrence in a relayed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Incremental text fragment of the assistant reply.
    Content(String),
    /// Terminal signal; no content follows.
    Done,
    /// Announces the id of a newly created conversation.
    ConversationId(String),
    /// Upstream or relay failure.
    Error(String),
    /// An event that could not be classified, kept as its raw block and
    /// forwarded unchanged.
    Passthrough(String),
}

/// Upstream payload shapes, discriminated by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum UpstreamPayload {
    #[serde(alias = "chunk")]
    Content {
        #[serde(alias = "content", alias = "text")]
        data: String,
    },
    #[serde(alias = "end")]
    Done,
    ConversationId {
        #[serde(alias = "conversation_id")]
        id: String,
    },
    Error {
        #[serde(default, alias = "message")]
        error: Option<String>,
    },
}

/// Client wire shapes; `type` is always serialized first.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent<'a> {
    Content { data: &'a str },
    ConversationId { id: &'a str },
    Done,
    Error { error: &'a str },
}

impl From<UpstreamPayload> for RelayEvent {
    fn from(payload: UpstreamPayload) -> Self {
        match payload {
            UpstreamPayload::Content { data } => RelayEvent::Content(data),
            UpstreamPayload::Done => RelayEvent::Done,
            UpstreamPayload::ConversationId { id } => RelayEvent::ConversationId(id),
            UpstreamPayload::Error { error } => {
                RelayEvent::Error(error.unwrap_or_else(|| UNSPECIFIED_ERROR.to_owned()))
            }
        }
    }
}

impl RelayEvent {
    /// Classify one delimited upstream event.
    ///
    /// Never fails: anything unrecognised becomes [`RelayEvent::Passthrough`].
    pub fn classify(event: &SseEvent) -> Self {
        let payload = event.data.trim();
        if payload == DONE_SENTINEL {
            return RelayEvent::Done;
        }
        match serde_json::from_str::<UpstreamPayload>(payload) {
            Ok(parsed) => parsed.into(),
            Err(e) => match serde_json::from_str::<Value>(payload) {
                Ok(value) if value.get("type").and_then(Value::as_str) == Some("error") => {
                    debug!(error = %e, "irregular upstream error payload");
                    RelayEvent::Error(error_message(&value))
                }
                Ok(_) => {
                    debug!(error = %e, "unrecognised upstream event type; passing through");
                    RelayEvent::Passthrough(event.raw.clone())
                }
                Err(_) => {
                    warn!(
                        error = %e,
                        payload_len = payload.len(),
                        "malformed upstream frame; passing through verbatim"
                    );
                    RelayEvent::Passthrough(event.raw.clone())
                }
            },
        }
    }

    /// `true` for events after which nothing more is forwarded.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayEvent::Done | RelayEvent::Error(_))
    }

    /// Canonical client frame: `data: <json>\n\n`, or the raw block plus
    /// delimiter for passthrough events.
    pub fn to_frame(&self) -> Bytes {
        let wire = match self {
            RelayEvent::Passthrough(raw) => {
                return Bytes::from(format!("{raw}{EVENT_DELIMITER}"));
            }
            RelayEvent::Content(text) => WireEvent::Content { data: text },
            RelayEvent::Done => WireEvent::Done,
            RelayEvent::ConversationId(id) => WireEvent::ConversationId { id },
            RelayEvent::Error(message) => WireEvent::Error { error: message },
        };
        match serde_json::to_string(&wire) {
            Ok(body) => Bytes::from(format!("data: {body}{EVENT_DELIMITER}")),
            Err(e) => {
                error!(error = %e, "failed to serialize relay event");
                Bytes::from_static(b"data: {\"type\":\"error\",\"error\":\"relay serialization failure\"}\n\n")
            }
        }
    }
}

/// Best-effort message of an `error` event whose shape did not match
/// [`UpstreamPayload::Error`]: a string `error`/`message`, or the `message`
/// of an `error` object.
fn error_message(value: &Value) -> String {
    ["error", "message"]
        .into_iter()
        .filter_map(|key| match value.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Object(detail) => detail.get("message")?.as_str().map(str::to_owned),
            _ => None,
        })
        .next()
        .unwrap_or_else(|| UNSPECIFIED_ERROR.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SseReframer;
    use tracing_test::traced_test;

    fn event(block: &str) -> SseEvent {
        SseEvent::from_block(block).expect("block has a data line")
    }

    #[test]
    fn content_and_chunk_are_both_content() {
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"content","data":"Hi"}"#)),
            RelayEvent::Content("Hi".into())
        );
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"chunk","content":" there"}"#)),
            RelayEvent::Content(" there".into())
        );
    }

    #[test]
    fn end_done_and_sentinel_are_terminal() {
        for block in [
            r#"data: {"type":"done"}"#,
            r#"data: {"type":"end","reason":"stop"}"#,
            "data: [DONE]",
        ] {
            let classified = RelayEvent::classify(&event(block));
            assert_eq!(classified, RelayEvent::Done, "{block}");
            assert!(classified.is_terminal());
        }
    }

    #[test]
    fn error_message_aliases() {
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"error","error":"boom"}"#)),
            RelayEvent::Error("boom".into())
        );
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"error","message":"rate limited"}"#)),
            RelayEvent::Error("rate limited".into())
        );
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"error"}"#)),
            RelayEvent::Error(UNSPECIFIED_ERROR.into())
        );
    }

    #[test]
    fn error_with_object_payload_is_still_an_error() {
        assert_eq!(
            RelayEvent::classify(&event(
                r#"data: {"type":"error","error":{"message":"rate limited","code":429}}"#
            )),
            RelayEvent::Error("rate limited".into())
        );
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"error","error":{"code":500}}"#)),
            RelayEvent::Error(UNSPECIFIED_ERROR.into())
        );
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"error","error":"a","message":"b"}"#)),
            RelayEvent::Error("a".into())
        );
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"error","error":7}"#)),
            RelayEvent::Error(UNSPECIFIED_ERROR.into())
        );
    }

    #[test]
    fn conversation_id_is_recognised() {
        assert_eq!(
            RelayEvent::classify(&event(r#"data: {"type":"conversation_id","id":"c-1"}"#)),
            RelayEvent::ConversationId("c-1".into())
        );
    }

    #[test]
    #[traced_test]
    fn malformed_payload_passes_through_byte_for_byte() {
        let block = "data: {not json";
        let classified = RelayEvent::classify(&event(block));
        assert_eq!(classified, RelayEvent::Passthrough(block.into()));
        assert_eq!(&classified.to_frame()[..], b"data: {not json\n\n");
        assert!(logs_contain("malformed upstream frame"));
    }

    #[test]
    fn unknown_type_passes_through() {
        let block = r#"data: {"type":"usage","tokens":12}"#;
        assert_eq!(
            RelayEvent::classify(&event(block)),
            RelayEvent::Passthrough(block.into())
        );
    }

    #[test]
    fn canonical_frames() {
        assert_eq!(
            &RelayEvent::Content("a\"b".into()).to_frame()[..],
            b"data: {\"type\":\"content\",\"data\":\"a\\\"b\"}\n\n"
        );
        assert_eq!(
            &RelayEvent::ConversationId("s-9".into()).to_frame()[..],
            b"data: {\"type\":\"conversation_id\",\"id\":\"s-9\"}\n\n"
        );
        assert_eq!(&RelayEvent::Done.to_frame()[..], b"data: {\"type\":\"done\"}\n\n");
        assert_eq!(
            &RelayEvent::Error("x".into()).to_frame()[..],
            b"data: {\"type\":\"error\",\"error\":\"x\"}\n\n"
        );
    }

    #[test]
    fn frames_reparse_to_the_same_events() {
        let events = vec![
            RelayEvent::ConversationId("s-1".into()),
            RelayEvent::Content("Hel".into()),
            RelayEvent::Content("lo\n\nworld".into()),
            RelayEvent::Error("bad".into()),
            RelayEvent::Done,
        ];
        let mut wire = Vec::new();
        for e in &events {
            wire.extend_from_slice(&e.to_frame());
        }
        let mut reframer = SseReframer::new();
        let parsed: Vec<RelayEvent> = reframer.push(&wire).map(|e| RelayEvent::classify(&e)).collect();
        assert_eq!(parsed, events);
    }
}
