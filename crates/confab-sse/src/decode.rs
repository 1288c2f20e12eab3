//! Streaming UTF-8 decoding.

use encoding_rs::{CoderResult, Decoder, UTF_8};

/// Incremental UTF-8 decoder.
///
/// A network chunk may end in the middle of a multi-byte character; the
/// decoder holds those bytes back and completes the character on the next
/// call. Invalid sequences decode to U+FFFD, the same as
/// [`String::from_utf8_lossy`].
pub struct Utf8Decoder {
    inner: Decoder,
}

impl std::fmt::Debug for Utf8Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Utf8Decoder")
    }
}

impl Default for Utf8Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8Decoder {
    pub fn new() -> Self {
        // A BOM in the middle of a relayed stream is content, not a marker.
        Self {
            inner: UTF_8.new_decoder_without_bom_handling(),
        }
    }

    /// Decode `bytes` and append the resulting text to `out`.
    ///
    /// Pass `last = true` exactly once, on the final call, to flush a
    /// dangling partial character as U+FFFD.
    pub fn decode_into(&mut self, bytes: &[u8], out: &mut String, last: bool) {
        let mut input = bytes;
        loop {
            let needed = self
                .inner
                .max_utf8_buffer_length(input.len())
                .unwrap_or(input.len().saturating_mul(3).saturating_add(4));
            out.reserve(needed);

            let (result, read, _replaced) = self.inner.decode_to_string(input, out, last);
            input = &input[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn multibyte_char_split_across_calls() {
        let text = "héllo → 世界";
        let bytes = text.as_bytes();
        let mut out = String::new();
        let mut decoder = Utf8Decoder::new();
        for b in bytes {
            decoder.decode_into(std::slice::from_ref(b), &mut out, false);
        }
        decoder.decode_into(&[], &mut out, true);
        assert_eq!(out, text);
    }

    #[test]
    fn partial_char_is_held_back() {
        // "€" is E2 82 AC.
        let mut out = String::new();
        let mut decoder = Utf8Decoder::new();
        decoder.decode_into(&[b'a', 0xE2, 0x82], &mut out, false);
        assert_eq!(out, "a");
        decoder.decode_into(&[0xAC, b'b'], &mut out, false);
        assert_eq!(out, "a€b");
    }

    #[test]
    fn dangling_bytes_flush_as_replacement() {
        let mut out = String::new();
        let mut decoder = Utf8Decoder::new();
        decoder.decode_into(&[b'x', 0xE2, 0x82], &mut out, false);
        decoder.decode_into(&[], &mut out, true);
        assert_eq!(out, "x\u{FFFD}");
    }

    #[test]
    fn invalid_bytes_are_replaced_not_dropped() {
        let mut out = String::new();
        let mut decoder = Utf8Decoder::new();
        decoder.decode_into(&[b'o', 0xFF, b'k'], &mut out, true);
        assert_eq!(out, "o\u{FFFD}k");
    }
}
