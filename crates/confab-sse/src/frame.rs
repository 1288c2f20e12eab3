//! Event-boundary reconstruction.
//!
//! [`SseReframer`] owns the only mutable state of the transform: a decoder
//! and a text buffer that persist across reads. Each [`SseReframer::push`]
//! appends a chunk and yields every event that is now complete; whatever
//! follows the last delimiter stays buffered until more bytes arrive or
//! [`SseReframer::finish`] is called.

use crate::decode::Utf8Decoder;

/// Authoritative boundary between two logical events.
pub const EVENT_DELIMITER: &str = "\n\n";

const DATA_PREFIX: &str = "data:";

/// One delimited event that carried at least one `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Joined `data:` payload (one leading space stripped per line).
    pub data: String,
    /// The event block exactly as received, without its delimiter.
    pub raw: String,
}

impl SseEvent {
    /// Extract the data payload of one event block.
    ///
    /// Returns `None` for blocks without a `data:` line (comments,
    /// keep-alives, bare `event:` lines).
    pub fn from_block(block: &str) -> Option<Self> {
        let mut data: Option<String> = None;
        for line in block.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let Some(value) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            let value = value.strip_prefix(' ').unwrap_or(value);
            match data.as_mut() {
                Some(joined) => {
                    joined.push('\n');
                    joined.push_str(value);
                }
                None => data = Some(value.to_owned()),
            }
        }
        data.map(|data| SseEvent {
            data,
            raw: block.to_owned(),
        })
    }
}

/// Split `buffer` on [`EVENT_DELIMITER`].
///
/// Returns the complete blocks and the undelimited remainder, which may be
/// empty. This is the whole reframing rule as a pure function.
pub fn split_blocks(buffer: &str) -> (Vec<&str>, &str) {
    let mut pieces: Vec<&str> = buffer.split(EVENT_DELIMITER).collect();
    // `split` always yields at least one piece.
    let rest = pieces.pop().unwrap_or("");
    (pieces, rest)
}

/// Per-turn incremental reframer.
#[derive(Debug, Default)]
pub struct SseReframer {
    decoder: Utf8Decoder,
    buffer: String,
}

impl SseReframer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of text currently waiting for a delimiter.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Append `chunk` and iterate over the events it completed.
    ///
    /// Events not pulled from the iterator before it is dropped stay
    /// buffered and are yielded by the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Events<'_> {
        self.decoder.decode_into(chunk, &mut self.buffer, false);
        Events {
            buffer: &mut self.buffer,
            consumed: 0,
        }
    }

    /// End of stream: flush the decoder and treat the remainder as final,
    /// possibly undelimited, events.
    pub fn finish(mut self) -> Vec<SseEvent> {
        let mut tail = std::mem::take(&mut self.buffer);
        self.decoder.decode_into(&[], &mut tail, true);
        tail.split(EVENT_DELIMITER)
            .filter_map(SseEvent::from_block)
            .collect()
    }
}

/// Iterator over the events completed by one [`SseReframer::push`].
pub struct Events<'a> {
    buffer: &'a mut String,
    consumed: usize,
}

impl Iterator for Events<'_> {
    type Item = SseEvent;

    fn next(&mut self) -> Option<SseEvent> {
        loop {
            let rest = &self.buffer[self.consumed..];
            let end = rest.find(EVENT_DELIMITER)?;
            let event = SseEvent::from_block(&rest[..end]);
            self.consumed += end + EVENT_DELIMITER.len();
            if event.is_some() {
                return event;
            }
        }
    }
}

impl Drop for Events<'_> {
    fn drop(&mut self) {
        self.buffer.drain(..self.consumed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STREAM: &str = concat!(
        ": keep-alive\n\n",
        "data: {\"type\":\"content\",\"data\":\"Grüße \"}\n\n",
        "event: message\ndata: {\"type\":\"chunk\",\"data\":\"世界 🌍\"}\n\n",
        "data: not json at all\n\n",
        "data: first line\ndata: second line\n\n",
        "data: {\"type\":\"done\"}\n\n",
    );

    fn reframe(chunks: &[&[u8]]) -> Vec<SseEvent> {
        let mut reframer = SseReframer::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(reframer.push(chunk));
        }
        events.extend(reframer.finish());
        events
    }

    fn split_at_cuts(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        let mut start = 0;
        for &cut in cuts {
            chunks.push(bytes[start..cut].to_vec());
            start = cut;
        }
        chunks.push(bytes[start..].to_vec());
        chunks
    }

    fn reframe_owned(chunks: &[Vec<u8>]) -> Vec<SseEvent> {
        let refs: Vec<&[u8]> = chunks.iter().map(Vec::as_slice).collect();
        reframe(&refs)
    }

    #[test]
    fn whole_stream_yields_data_events_in_order() {
        let events = reframe(&[STREAM.as_bytes()]);
        let data: Vec<&str> = events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(
            data,
            vec![
                "{\"type\":\"content\",\"data\":\"Grüße \"}",
                "{\"type\":\"chunk\",\"data\":\"世界 🌍\"}",
                "not json at all",
                "first line\nsecond line",
                "{\"type\":\"done\"}",
            ]
        );
    }

    #[test]
    fn one_byte_at_a_time_matches_single_chunk() {
        let expected = reframe(&[STREAM.as_bytes()]);
        let chunks: Vec<Vec<u8>> = STREAM.bytes().map(|b| vec![b]).collect();
        assert_eq!(reframe_owned(&chunks), expected);
    }

    #[test]
    fn every_pair_of_cut_points_matches_single_chunk() {
        let bytes = STREAM.as_bytes();
        let expected = reframe(&[bytes]);
        for i in 0..=bytes.len() {
            for j in i..=bytes.len() {
                let chunks = split_at_cuts(bytes, &[i, j]);
                assert_eq!(reframe_owned(&chunks), expected, "cuts at {i} and {j}");
            }
        }
    }

    #[test]
    fn cut_inside_delimiter_keeps_event_pending() {
        let mut reframer = SseReframer::new();
        assert_eq!(reframer.push(b"data: a\n").count(), 0);
        assert_eq!(reframer.pending(), "data: a\n");
        let events: Vec<_> = reframer.push(b"\ndata: b").collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a");
        assert_eq!(reframer.pending(), "data: b");
    }

    #[test]
    fn undelimited_tail_is_processed_on_finish() {
        let mut reframer = SseReframer::new();
        assert_eq!(reframer.push(b"data: {\"type\":\"done\"}").count(), 0);
        let events = reframer.finish();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"type\":\"done\"}");
    }

    #[test]
    fn blocks_without_data_are_discarded() {
        let events = reframe(&[b": ping\n\nevent: noop\n\n\n\nid: 4\n\n"]);
        assert!(events.is_empty());
    }

    #[test]
    fn raw_block_is_preserved_verbatim() {
        let events = reframe(&[b"event: x\ndata:no-space\r\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "no-space");
        assert_eq!(events[0].raw, "event: x\ndata:no-space\r");
    }

    #[test]
    fn undrained_events_survive_until_next_push() {
        let mut reframer = SseReframer::new();
        {
            let mut events = reframer.push(b"data: 1\n\ndata: 2\n\n");
            assert_eq!(events.next().map(|e| e.data), Some("1".to_owned()));
        }
        let rest: Vec<_> = reframer.push(b"data: 3\n\n").map(|e| e.data).collect();
        assert_eq!(rest, vec!["2", "3"]);
    }

    #[test]
    fn split_blocks_returns_remainder() {
        let (blocks, rest) = split_blocks("a\n\nb\n\nc");
        assert_eq!(blocks, vec!["a", "b"]);
        assert_eq!(rest, "c");

        let (blocks, rest) = split_blocks("a\n\n");
        assert_eq!(blocks, vec!["a"]);
        assert_eq!(rest, "");
    }

    proptest! {
        #[test]
        fn arbitrary_chunking_is_invariant(mut cuts in proptest::collection::vec(0..=STREAM.len(), 0..24)) {
            cuts.sort_unstable();
            cuts.dedup();
            let bytes = STREAM.as_bytes();
            let chunks = split_at_cuts(bytes, &cuts);
            prop_assert_eq!(reframe_owned(&chunks), reframe(&[bytes]));
        }
    }
}
