//! confab-sse – incremental server-sent-events reframing.
//!
//! An upstream completion service streams its reply as `data: <json>\n\n`
//! events, but the network delivers arbitrary byte chunks: an event may be
//! split across reads, several events may share one read, and a multi-byte
//! character may straddle two reads. This crate rebuilds the logical events
//! and classifies them.
//!
//! ```
//! use confab_sse::{RelayEvent, SseReframer};
//!
//! let mut reframer = SseReframer::new();
//! let mut seen = Vec::new();
//! for chunk in [&b"data: {\"type\":\"content\",\"da"[..], &b"ta\":\"Hi\"}\n\ndata: {\"type\":\"done\"}\n\n"[..]] {
//!     seen.extend(reframer.push(chunk).map(|e| RelayEvent::classify(&e)));
//! }
//! assert_eq!(seen, vec![RelayEvent::Content("Hi".into()), RelayEvent::Done]);
//! ```

mod decode;
mod event;
mod frame;

pub use decode::Utf8Decoder;
pub use event::RelayEvent;
pub use frame::{EVENT_DELIMITER, Events, SseEvent, SseReframer, split_blocks};

/// `Content-Type` of the client-facing stream.
pub const CONTENT_TYPE: &str = "text/event-stream";
